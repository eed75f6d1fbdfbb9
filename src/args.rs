use clap::Parser;

/// This is an instant-runoff vote counting program.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the election: candidates, ballot files and rules.
    /// The other options override the values it contains.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the outcome of an election in JSON format. If provided, irvcount will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The file containing the ballots, as 'rank,name' records. Setting this option
    /// replaces the ballot files that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (repeatable) The name of a candidate, in roster order. Replaces the candidates of the configuration.
    #[clap(long = "candidate", value_parser)]
    pub candidates: Vec<String>,

    /// (random, randomSeeded, hashed or useCandidateOrder) How to eliminate one of several candidates tied
    /// for the lowest count.
    #[clap(long, value_parser)]
    pub tiebreak: Option<String>,

    /// The seed of the randomSeeded and hashed tie-breaking modes.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
