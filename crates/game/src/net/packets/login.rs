use crate::character::Appearance;
use crate::net::codec::{BitReader, BitWriter, CodecError};
use crate::net::protocol::{Message, PacketType, Payload};

pub const GEAR_ID_BITS: u32 = 11;
pub const COLOR_BITS: u32 = 24;
pub const CHARACTER_LEVEL_BITS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticate {
    pub email: String,
}

impl Payload for Authenticate {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.email);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            email: r.read_string()?,
        })
    }
}

impl Message for Authenticate {
    const TYPE: PacketType = PacketType::Authenticate;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSummary {
    pub name: String,
    pub class_name: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterList {
    pub user_id: u32,
    pub max_characters: u32,
    pub characters: Vec<CharacterSummary>,
}

impl Payload for CharacterList {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.user_id);
        w.write_var_u32(self.max_characters);
        w.write_var_u32(self.characters.len() as u32);
        for c in &self.characters {
            w.write_string(&c.name);
            w.write_string(&c.class_name);
            w.write_bits(c.level, CHARACTER_LEVEL_BITS);
        }
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        let user_id = r.read_var_u32()?;
        let max_characters = r.read_var_u32()?;
        let count = r.read_var_u32()?;
        let mut characters = Vec::new();
        for _ in 0..count {
            characters.push(CharacterSummary {
                name: r.read_string()?,
                class_name: r.read_string()?,
                level: r.read_bits(CHARACTER_LEVEL_BITS)?,
            });
        }
        Ok(Self {
            user_id,
            max_characters,
            characters,
        })
    }
}

impl Message for CharacterList {
    const TYPE: PacketType = PacketType::CharacterList;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectCharacter {
    pub name: String,
}

impl Payload for SelectCharacter {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.name);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: r.read_string()?,
        })
    }
}

impl Message for SelectCharacter {
    const TYPE: PacketType = PacketType::SelectCharacter;
}

fn write_appearance(w: &mut BitWriter, a: &Appearance) {
    for part in [&a.gender, &a.head, &a.hair, &a.mouth, &a.face] {
        w.write_string(part);
    }
    for color in [a.hair_color, a.skin_color, a.shirt_color, a.pant_color] {
        w.write_bits(color, COLOR_BITS);
    }
}

fn read_appearance(r: &mut BitReader<'_>) -> Result<Appearance, CodecError> {
    Ok(Appearance {
        gender: r.read_string()?,
        head: r.read_string()?,
        hair: r.read_string()?,
        mouth: r.read_string()?,
        face: r.read_string()?,
        hair_color: r.read_bits(COLOR_BITS)?,
        skin_color: r.read_bits(COLOR_BITS)?,
        shirt_color: r.read_bits(COLOR_BITS)?,
        pant_color: r.read_bits(COLOR_BITS)?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCharacter {
    pub name: String,
    pub class_name: String,
    pub appearance: Appearance,
}

impl Payload for CreateCharacter {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.name);
        w.write_string(&self.class_name);
        write_appearance(w, &self.appearance);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: r.read_string()?,
            class_name: r.read_string()?,
            appearance: read_appearance(r)?,
        })
    }
}

impl Message for CreateCharacter {
    const TYPE: PacketType = PacketType::CreateCharacter;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperdollRequest {
    pub name: String,
}

impl Payload for PaperdollRequest {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.name);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: r.read_string()?,
        })
    }
}

impl Message for PaperdollRequest {
    const TYPE: PacketType = PacketType::PaperdollRequest;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperdollView {
    pub name: String,
    pub class_name: String,
    pub appearance: Appearance,
    pub gear: [u32; 6],
}

/// Character preview. An unknown character is answered with an empty payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paperdoll(pub Option<PaperdollView>);

impl Payload for Paperdoll {
    fn encode(&self, w: &mut BitWriter) {
        let Some(view) = &self.0 else { return };
        w.write_string(&view.name);
        w.write_string(&view.class_name);
        write_appearance(w, &view.appearance);
        for &gear_id in &view.gear {
            w.write_bits(gear_id, GEAR_ID_BITS);
        }
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        if r.remaining_bits() == 0 {
            return Ok(Self(None));
        }
        let name = r.read_string()?;
        let class_name = r.read_string()?;
        let appearance = read_appearance(r)?;
        let mut gear = [0; 6];
        for slot in &mut gear {
            *slot = r.read_bits(GEAR_ID_BITS)?;
        }
        Ok(Self(Some(PaperdollView {
            name,
            class_name,
            appearance,
            gear,
        })))
    }
}

impl Message for Paperdoll {
    const TYPE: PacketType = PacketType::Paperdoll;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub message: String,
    pub disconnect: bool,
}

impl Payload for Popup {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.message);
        w.write_bool(self.disconnect);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            message: r.read_string()?,
            disconnect: r.read_bool()?,
        })
    }
}

impl Message for Popup {
    const TYPE: PacketType = PacketType::Popup;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_list_layout() {
        let list = CharacterList {
            user_id: 3,
            max_characters: 8,
            characters: vec![CharacterSummary {
                name: "Ada".into(),
                class_name: "Rogue".into(),
                level: 63,
            }],
        };
        let decoded = CharacterList::from_payload(&list.to_payload()).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn test_empty_paperdoll() {
        let payload = Paperdoll(None).to_payload();
        assert!(payload.is_empty());
        assert_eq!(Paperdoll::from_payload(&payload).unwrap(), Paperdoll(None));
    }

    #[test]
    fn test_paperdoll_gear_width() {
        let view = PaperdollView {
            name: "Ada".into(),
            class_name: "Mage".into(),
            appearance: Appearance {
                hair_color: 0xFF_00_FF,
                ..Default::default()
            },
            gear: [53, 65, 0, 0, 0, 2047],
        };
        let payload = Paperdoll(Some(view.clone())).to_payload();
        assert_eq!(
            Paperdoll::from_payload(&payload).unwrap(),
            Paperdoll(Some(view))
        );
    }
}
