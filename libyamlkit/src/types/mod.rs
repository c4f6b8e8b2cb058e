//! Built-in type bindings.
//!
//! - failsafe: `str`, `seq`, `map`
//! - core: implicit `null`, `bool`, `int`, `float`
//! - extended: implicit `timestamp` and `merge`; explicit `binary`,
//!   `omap`, `pairs` and `set`

use std::sync::Arc;

use crate::schema::Type;

mod binary;
mod bool;
mod collections;
mod failsafe;
mod float;
mod int;
mod merge;
mod null;
mod timestamp;

pub use self::binary::BinaryType;
pub use self::bool::BoolType;
pub use self::collections::{OmapType, PairsType, SetType};
pub use self::failsafe::{MapType, SeqType, StrType};
pub use self::float::FloatType;
pub use self::int::IntType;
pub use self::merge::MergeType;
pub use self::null::NullType;
pub use self::timestamp::TimestampType;

pub const STR_TAG: &str = "tag:yaml.org,2002:str";
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";
pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
pub const TIMESTAMP_TAG: &str = "tag:yaml.org,2002:timestamp";
pub const MERGE_TAG: &str = "tag:yaml.org,2002:merge";
pub const BINARY_TAG: &str = "tag:yaml.org,2002:binary";
pub const OMAP_TAG: &str = "tag:yaml.org,2002:omap";
pub const PAIRS_TAG: &str = "tag:yaml.org,2002:pairs";
pub const SET_TAG: &str = "tag:yaml.org,2002:set";

/// Tags whose nodes are written without a tag.
pub(crate) fn is_failsafe_tag(tag: &str) -> bool {
    tag == STR_TAG || tag == SEQ_TAG || tag == MAP_TAG
}

fn unknown_style(tag: &str, style: &str) -> String {
    format!("!<{}> tag resolver accepts not \"{}\" style", tag, style)
}

pub(crate) fn failsafe() -> Vec<Arc<dyn Type>> {
    vec![Arc::new(StrType), Arc::new(SeqType), Arc::new(MapType)]
}

pub(crate) fn core() -> Vec<Arc<dyn Type>> {
    vec![
        Arc::new(NullType),
        Arc::new(BoolType),
        Arc::new(IntType),
        Arc::new(FloatType),
    ]
}

pub(crate) fn extended() -> Vec<Arc<dyn Type>> {
    vec![
        Arc::new(TimestampType),
        Arc::new(MergeType),
        Arc::new(BinaryType),
        Arc::new(OmapType),
        Arc::new(PairsType),
        Arc::new(SetType),
    ]
}
