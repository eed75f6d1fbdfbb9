use log::{debug, info, warn};

use instant_runoff::*;
use snafu::prelude::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::rcv::config_reader::*;
use crate::rcv::io_common::{group_ranked_entries, RankedEntry};

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RcvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The Excel file {path} has no worksheet named {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("{path}, row {lineno}: expected a rank, found {content}"))]
    ExcelWrongCellType {
        path: String,
        lineno: usize,
        content: String,
    },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading file {path}"))]
    CsvLineParse { source: csv::Error, path: String },
    #[snafu(display("{path}, line {lineno}: expected a 'rank,name' record, found {content:?}"))]
    InvalidRecord {
        path: String,
        lineno: usize,
        content: String,
    },
    #[snafu(display("{path}, line {lineno}: {source}"))]
    InvalidBallot {
        source: TallyError,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive number, found {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("No candidates: pass --candidate or list them in the configuration"))]
    MissingCandidates {},
    #[snafu(display("No ballots: pass --input or add an entry to cvrFileSources"))]
    MissingInput {},
    #[snafu(display("Unknown input type {provider:?} (expected csv or xlsx)"))]
    UnknownProvider { provider: String },
    #[snafu(display("Invalid rules: {message}"))]
    InvalidRules { message: String },
    #[snafu(display("Counting error"))]
    Tally { source: TallyError },
    #[snafu(display("Difference detected between calculated summary and reference summary {path}"))]
    ReferenceMismatch { path: String },
}

pub type RcvResult<T> = Result<T, RcvError>;

fn result_stats_to_json(rs: &VotingResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in rs.round_stats.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (name, count) in round_stat.tally.iter() {
            tally.insert(name.clone(), json!(count.to_string()));
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        if let Some(elim_stats) = &round_stat.eliminated {
            let mut transfers: JSMap<String, JSValue> = JSMap::new();
            for (name, count) in elim_stats.transfers.iter() {
                transfers.insert(name.clone(), json!(count.to_string()));
            }
            if elim_stats.exhausted > 0 {
                transfers.insert(
                    "exhausted".to_string(),
                    json!(elim_stats.exhausted.to_string()),
                );
            }
            let mut result = json!({
                "eliminated": elim_stats.name,
                "transfers": transfers
            });
            if !elim_stats.tied_with.is_empty() {
                result["tiedWith"] = json!(elim_stats.tied_with);
            }
            tally_results.push(result);
        }
        if let Some(winner_name) = &round_stat.elected {
            tally_results.push(json!({
                "elected": winner_name,
                "transfers": {}
            }));
        }

        let js = json!({"round": round_stat.round, "tally": tally, "tallyResults": tally_results});
        l.push(js);
    }
    l
}

fn build_summary_js(config: &RcvConfig, rv: &VotingResult) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_jurisdiction.clone(),
        office: config.output_settings.contest_office.clone(),
        threshold: Some(rv.winning_percentage.to_string()),
    };
    json!({
        "config": c,
        "results": result_stats_to_json(rv),
        "winner": rv.winner
    })
}

fn validate_rules(rcv_rules: &RcvRules) -> RcvResult<VoteRules> {
    let seed = rcv_rules.random_seed()?;
    let tiebreak_mode = match (rcv_rules.tiebreak_mode.as_deref().unwrap_or("random"), seed) {
        ("random", None) => TieBreakMode::Random,
        // A seed makes the random mode reproducible.
        ("random", Some(s)) | ("randomSeeded", Some(s)) => TieBreakMode::RandomSeeded(s),
        ("hashed", Some(s)) => match u32::try_from(s) {
            Ok(x) => TieBreakMode::Hashed(x),
            Err(_) => {
                return InvalidRulesSnafu {
                    message: format!("the seed of the hashed mode must fit in 32 bits, got {}", s),
                }
                .fail()
            }
        },
        (x @ ("randomSeeded" | "hashed"), None) => {
            return InvalidRulesSnafu {
                message: format!("tiebreak mode {:?} requires a random seed", x),
            }
            .fail()
        }
        ("useCandidateOrder", _) => TieBreakMode::UseCandidateOrder,
        (x, _) => {
            return InvalidRulesSnafu {
                message: format!("unknown tiebreak mode {:?}", x),
            }
            .fail()
        }
    };
    let rules = VoteRules {
        tiebreak_mode,
        winning_percentage: rcv_rules
            .winning_percentage()?
            .unwrap_or(VoteRules::MAJORITY_PERCENTAGE),
        duplicate_candidate_mode: match rcv_rules.reject_duplicate_candidates {
            Some(true) => DuplicateCandidateMode::Reject,
            _ => DuplicateCandidateMode::SkipDuplicate,
        },
    };
    rules.validate().context(TallySnafu {})?;
    Ok(rules)
}

/// The configuration to run, with the command line applied on top of the configuration file,
/// and the directory its ballot files are relative to.
fn load_config(args: &Args) -> RcvResult<(RcvConfig, PathBuf)> {
    let (mut config, mut root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => (RcvConfig::default(), PathBuf::new()),
    };

    if let Some(input) = &args.input {
        let provider = args.input_type.clone().unwrap_or_else(|| "csv".to_string());
        config.cvr_file_sources = vec![FileSource::new(input, &provider, None, None)];
        // Paths given on the command line are relative to the working directory.
        root = PathBuf::new();
    }
    if let Some(sheet) = &args.excel_worksheet_name {
        for cfs in config.cvr_file_sources.iter_mut() {
            cfs.excel_worksheet_name = Some(sheet.clone());
        }
    }
    if !args.candidates.is_empty() {
        config.candidates = args
            .candidates
            .iter()
            .map(|name| RcvCandidate { name: name.clone() })
            .collect();
    }
    if let Some(mode) = &args.tiebreak {
        config.rules.tiebreak_mode = Some(mode.clone());
    }
    if let Some(seed) = args.seed {
        config.rules.random_seed = Some(JSValue::from(seed));
    }
    Ok((config, root))
}

fn read_ranking_data(path: &str, cfs: &FileSource) -> RcvResult<Vec<RankedEntry>> {
    info!("Attempting to read rank file {:?}", path);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_ranking(path, cfs),
        "xlsx" => io_xlsx::read_excel_ranking(path, cfs),
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

fn read_ballots(path: &str, cfs: &FileSource, election: &mut Election) -> RcvResult<usize> {
    let entries = read_ranking_data(path, cfs)?;
    let groups = group_ranked_entries(entries);
    let num_ballots = groups.len();
    for group in groups {
        let mut builder = BallotBuilder::new();
        for entry in group.iter() {
            builder
                .append_name(election.registry(), &entry.name)
                .context(InvalidBallotSnafu {
                    path,
                    lineno: entry.lineno,
                })?;
        }
        let lineno = group.first().map(|e| e.lineno).unwrap_or(0);
        election
            .add_ballot(builder.seal())
            .context(InvalidBallotSnafu { path, lineno })?;
    }
    debug!("read_ballots: {} ballots in {}", num_ballots, path);
    Ok(num_ballots)
}

/// Runs the election described by the command line and returns its summary.
pub fn tabulate(args: &Args) -> RcvResult<(RcvConfig, PathBuf, JSValue)> {
    let (config, root) = load_config(args)?;
    info!("config: {:?}", config);

    let rules = validate_rules(&config.rules)?;
    ensure!(!config.candidates.is_empty(), MissingCandidatesSnafu {});
    ensure!(!config.cvr_file_sources.is_empty(), MissingInputSnafu {});

    let names: Vec<&str> = config.candidates.iter().map(|c| c.name.as_str()).collect();
    let registry = CandidateRegistry::new(&names).context(TallySnafu {})?;
    let mut election = Election::new(registry, &rules).context(TallySnafu {})?;

    for cfs in config.cvr_file_sources.iter() {
        let p = root.join(&cfs.file_path).display().to_string();
        read_ballots(&p, cfs, &mut election)?;
    }

    let result = election.run().context(TallySnafu {})?;
    info!("winner: {:?}", result.winner);

    let summary = build_summary_js(&config, &result);
    Ok((config, root, summary))
}

fn write_summary(out: &str, pretty_js_stats: &str) -> RcvResult<()> {
    if out == "stdout" {
        println!("{}", pretty_js_stats);
        return Ok(());
    }
    if let Some(parent) = Path::new(out).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingOutputSnafu { path: out })?;
        }
    }
    fs::write(out, pretty_js_stats).context(WritingOutputSnafu { path: out })?;
    info!("Summary written to {}", out);
    Ok(())
}

fn check_reference(summary_p: &str, pretty_js_stats: &str) -> RcvResult<()> {
    let summary_ref = read_summary(summary_p)?;
    debug!("summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        return ReferenceMismatchSnafu { path: summary_p }.fail();
    }
    info!("The summary matches the reference {}", summary_p);
    Ok(())
}

pub fn run_election(args: &Args) -> RcvResult<()> {
    let (config, root, summary) = tabulate(args)?;
    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;

    let out = match (&args.out, &config.output_settings.output_directory) {
        (Some(out), _) => out.clone(),
        (None, Some(dir)) => root.join(dir).join("summary.json").display().to_string(),
        (None, None) => "stdout".to_string(),
    };
    write_summary(&out, &pretty_js_stats)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        check_reference(summary_p, &pretty_js_stats)?;
    }
    Ok(())
}

#[cfg(test)]
fn test_dir(test_name: &str) -> String {
    format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), test_name)
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = test_dir(test_name);
    let args = Args {
        config: Some(format!("{}/{}_config.json", dir, test_name)),
        reference: Some(format!("{}/{}_expected_summary.json", dir, test_name)),
        out: Some("stdout".to_string()),
        ..Args::default()
    };
    info!("Running test {}", test_name);
    if let Err(e) = run_election(&args) {
        eprintln!("An error occured {}", e);
        if let Some(bt) = snafu::ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        panic!("test {} failed: {:?}", test_name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_candidates() {
        test_wrapper("four_candidates");
    }

    #[test]
    fn tied_lowest() {
        test_wrapper("tied_lowest");
    }

    #[test]
    fn xlsx_ballots() {
        test_wrapper("xlsx_ballots");
    }

    #[test]
    fn command_line_without_config() {
        let dir = test_dir("tied_lowest");
        let args = Args {
            input: Some(format!("{}/tied_lowest_ballots.csv", dir)),
            candidates: ["Ollie", "Alicia", "George", "Smith, Robert"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tiebreak: Some("useCandidateOrder".to_string()),
            ..Args::default()
        };
        let (_, _, summary) = tabulate(&args).unwrap();
        assert_eq!(summary["winner"], json!("Ollie"));
        assert_eq!(summary["config"]["threshold"], json!("51"));
        assert_eq!(summary["results"][0]["tallyResults"][0]["eliminated"], json!("Alicia"));
    }

    #[test]
    fn command_line_overrides_config() {
        let dir = test_dir("four_candidates");
        let args = Args {
            config: Some(format!("{}/four_candidates_config.json", dir)),
            candidates: vec!["Ollie".to_string(), "Alicia".to_string()],
            ..Args::default()
        };
        let err = tabulate(&args).unwrap_err();
        match err {
            RcvError::InvalidBallot { source, lineno, .. } => {
                assert_eq!(
                    source,
                    TallyError::NotFound {
                        name: "George".to_string()
                    }
                );
                assert_eq!(lineno, 4);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn reference_mismatch_fails() {
        let dir = test_dir("four_candidates");
        let args = Args {
            config: Some(format!("{}/four_candidates_config.json", dir)),
            reference: Some(format!("{}/../tied_lowest/tied_lowest_expected_summary.json", dir)),
            out: Some("stdout".to_string()),
            ..Args::default()
        };
        assert!(matches!(
            run_election(&args),
            Err(RcvError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn missing_pieces() {
        assert!(matches!(
            tabulate(&Args::default()),
            Err(RcvError::MissingCandidates {})
        ));
        let args = Args {
            candidates: vec!["Ollie".to_string()],
            ..Args::default()
        };
        assert!(matches!(tabulate(&args), Err(RcvError::MissingInput {})));
        let args = Args {
            candidates: vec!["Ollie".to_string()],
            input: Some("ballots.txt".to_string()),
            input_type: Some("pdf".to_string()),
            ..Args::default()
        };
        assert!(matches!(
            tabulate(&args),
            Err(RcvError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn rules_from_config() {
        let rules = validate_rules(&RcvRules::default()).unwrap();
        assert_eq!(rules, VoteRules::DEFAULT_RULES);

        let rcv_rules = RcvRules {
            tiebreak_mode: Some("hashed".to_string()),
            random_seed: Some(json!("17")),
            winning_percentage: Some(json!(60)),
            reject_duplicate_candidates: Some(true),
            ..RcvRules::default()
        };
        let rules = validate_rules(&rcv_rules).unwrap();
        assert_eq!(rules.tiebreak_mode, TieBreakMode::Hashed(17));
        assert_eq!(rules.winning_percentage, 60);
        assert_eq!(rules.duplicate_candidate_mode, DuplicateCandidateMode::Reject);

        let seedless = RcvRules {
            tiebreak_mode: Some("randomSeeded".to_string()),
            ..RcvRules::default()
        };
        assert!(matches!(
            validate_rules(&seedless),
            Err(RcvError::InvalidRules { .. })
        ));
        let seeded_random = RcvRules {
            tiebreak_mode: Some("random".to_string()),
            random_seed: Some(json!(7)),
            ..RcvRules::default()
        };
        assert_eq!(
            validate_rules(&seeded_random).unwrap().tiebreak_mode,
            TieBreakMode::RandomSeeded(7)
        );
        let unknown = RcvRules {
            tiebreak_mode: Some("coinToss".to_string()),
            ..RcvRules::default()
        };
        assert!(validate_rules(&unknown).is_err());
        let too_high = RcvRules {
            winning_percentage: Some(json!(120)),
            ..RcvRules::default()
        };
        assert!(matches!(
            validate_rules(&too_high),
            Err(RcvError::Tally { .. })
        ));
    }

    #[test]
    fn summary_layout() {
        let rv = VotingResult {
            winner: Some("B".to_string()),
            winning_percentage: 51,
            total_ballots: 3,
            round_stats: vec![
                RoundStats {
                    round: 1,
                    tally: vec![("C".to_string(), 0), ("B".to_string(), 2), ("A".to_string(), 1)],
                    exhausted: 0,
                    elected: None,
                    eliminated: Some(EliminationStats {
                        name: "C".to_string(),
                        tied_with: vec!["A".to_string()],
                        transfers: vec![],
                        exhausted: 0,
                    }),
                },
                RoundStats {
                    round: 2,
                    tally: vec![("A".to_string(), 1), ("B".to_string(), 2)],
                    exhausted: 0,
                    elected: Some("B".to_string()),
                    eliminated: None,
                },
            ],
        };
        let js = build_summary_js(&RcvConfig::default(), &rv);
        assert_eq!(
            js["results"],
            json!([
                {"round": 1, "tally": {"A": "1", "B": "2", "C": "0"},
                 "tallyResults": [{"eliminated": "C", "tiedWith": ["A"], "transfers": {}}]},
                {"round": 2, "tally": {"A": "1", "B": "2"},
                 "tallyResults": [{"elected": "B", "transfers": {}}]}
            ])
        );
        assert_eq!(js["winner"], json!("B"));
        assert_eq!(js["config"]["office"], JSValue::Null);
        assert!(js["results"][1]["tallyResults"][0].get("tiedWith").is_none());

        // Candidates are listed by name, whatever the roster order.
        let pretty = serde_json::to_string_pretty(&js["results"][0]["tally"]).unwrap();
        let positions: Vec<usize> = ["\"A\"", "\"B\"", "\"C\""]
            .iter()
            .map(|name| pretty.find(name).unwrap())
            .collect();
        assert!(positions[0] < positions[1] && positions[1] < positions[2]);
    }
}
