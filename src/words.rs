use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;

static WORD_DIR: Dir = include_dir!("src/words");

/// A word bank compiled into the binary. Neutral and emotional variants draw
/// their stimulus words from these instead of the color palette.
#[allow(dead_code)]
#[derive(Deserialize, Clone, Debug)]
pub struct WordBank {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl WordBank {
    pub fn neutral() -> Self {
        read_bank("neutral.json")
    }

    pub fn emotional() -> Self {
        read_bank("emotional.json")
    }
}

fn read_bank(file_name: &str) -> WordBank {
    let file = WORD_DIR.get_file(file_name).expect("word bank not found");

    let file_as_str = file
        .contents_utf8()
        .expect("unable to interpret word bank as a string");

    from_str(file_as_str).expect("unable to deserialize word bank json")
}
