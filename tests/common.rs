//! Test utilities & fixtures.
//! A small forum cast shared by the integration tests.
#![allow(dead_code)]

use storybb_mentions::directory::JsonDirectory;
use storybb_mentions::mentions::{CharacterRecord, MemberRecord};

pub const MEMBER_JANE: u64 = 1;
pub const MEMBER_DOE: u64 = 2;
pub const MEMBER_GHOST: u64 = 3;
pub const MEMBER_RETIRED: u64 = 4;
pub const MEMBER_TOONS: u64 = 5;

pub const CHAR_JANE: u64 = 11;
pub const CHAR_JANE_DOE: u64 = 21;
pub const CHAR_ROOK: u64 = 22;
pub const CHAR_GHOST: u64 = 31;
pub const CHAR_OLD_TIMER: u64 = 41;
pub const CHAR_TOM_AND_JERRY: u64 = 51;

fn character(id: u64, member_id: u64, name: &str, is_main: bool) -> CharacterRecord {
    CharacterRecord {
        id,
        member_id,
        name: name.to_string(),
        is_main,
        retired: false,
    }
}

fn member(id: u64, name: &str, groups: Vec<u32>, locale: Option<&str>) -> MemberRecord {
    MemberRecord {
        id,
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase()),
        primary_group: 0,
        post_group: 4,
        additional_groups: groups,
        locale: locale.map(str::to_string),
    }
}

pub fn characters() -> Vec<CharacterRecord> {
    let mut retired = character(CHAR_OLD_TIMER, MEMBER_RETIRED, "Old Timer", true);
    retired.retired = true;
    vec![
        character(CHAR_JANE, MEMBER_JANE, "Jane", true),
        character(CHAR_JANE_DOE, MEMBER_DOE, "Jane Doe", true),
        character(CHAR_ROOK, MEMBER_DOE, "Rook", false),
        character(CHAR_GHOST, MEMBER_GHOST, "Ghost", true),
        retired,
        // Names are stored entity-encoded, like the forum does.
        character(CHAR_TOM_AND_JERRY, MEMBER_TOONS, "Tom &amp; Jerry", false),
    ]
}

pub fn members() -> Vec<MemberRecord> {
    vec![
        member(MEMBER_JANE, "janeplayer", vec![9], Some("english")),
        member(MEMBER_DOE, "doeplayer", vec![], None),
        member(MEMBER_GHOST, "ghostplayer", vec![9, 12], Some("german")),
        member(MEMBER_RETIRED, "oldplayer", vec![], None),
        member(MEMBER_TOONS, "toonplayer", vec![], None),
    ]
}

pub fn forum_directory() -> JsonDirectory {
    JsonDirectory::from_records(characters(), members())
}

/// Permission gate that lets everyone mention.
pub fn anyone(_: u64) -> bool {
    true
}
