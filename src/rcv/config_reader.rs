use crate::rcv::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName", default)]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
}

/// The `config` block of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
    pub threshold: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    pub fn new(
        file_path: &str,
        provider: &str,
        first_vote_row_index: Option<u64>,
        excel_worksheet_name: Option<String>,
    ) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _first_vote_row_index: first_vote_row_index.map(JSValue::from),
            excel_worksheet_name,
        }
    }

    /// The 1-based row of the first record. Defaults to the first row.
    pub fn first_vote_row_index(&self) -> RcvResult<usize> {
        let x = read_js_int(&self._first_vote_row_index)?.unwrap_or(1);
        ensure!(
            x >= 1,
            ParsingJsonNumberSnafu {
                value: x.to_string()
            }
        );
        Ok(x as usize)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvCandidate {
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RcvRules {
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<JSValue>,
    #[serde(rename = "winningPercentage")]
    pub winning_percentage: Option<JSValue>,
    #[serde(rename = "rejectDuplicateCandidates")]
    pub reject_duplicate_candidates: Option<bool>,
    #[serde(rename = "rulesDescription")]
    pub rules_description: Option<String>,
}

impl RcvRules {
    pub fn random_seed(&self) -> RcvResult<Option<u64>> {
        read_js_int(&self.random_seed)
    }

    pub fn winning_percentage(&self) -> RcvResult<Option<u32>> {
        match read_js_int(&self.winning_percentage)? {
            Some(x) => u32::try_from(x)
                .ok()
                .map(Some)
                .context(ParsingJsonNumberSnafu {
                    value: x.to_string(),
                }),
            None => Ok(None),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RcvConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "cvrFileSources", default)]
    pub cvr_file_sources: Vec<FileSource>,
    #[serde(default)]
    pub candidates: Vec<RcvCandidate>,
    #[serde(default)]
    pub rules: RcvRules,
}

pub fn read_config(path: &str) -> RcvResult<RcvConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RcvConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> RcvResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> RcvResult<Option<u64>> {
    match x {
        None | Some(JSValue::Null) => Ok(None),
        Some(JSValue::Number(n)) => n.as_u64().map(Some).context(ParsingJsonNumberSnafu {
            value: n.to_string(),
        }),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<u64>()
            .ok()
            .map(Some)
            .context(ParsingJsonNumberSnafu { value: s }),
        Some(other) => ParsingJsonNumberSnafu {
            value: other.to_string(),
        }
        .fail(),
    }
}
