use std::{fs::File, io::BufReader, path::Path};

use serde_derive::{Deserialize, Serialize};

use crate::{
    alignment::AlignmentParams, error::EvalError, frame_distance::FrameDistanceParams,
    frames::MatchParams,
};

/// All tunables of an evaluation session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalParams {
    pub alignment: AlignmentParams,
    pub matching: MatchParams,
    pub frame_distance: FrameDistanceParams,
}

impl EvalParams {
    /// Loads the parameters from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, EvalError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_string(&self) -> Result<String, EvalError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
