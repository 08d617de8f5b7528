use argh::FromArgs;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};
use woundlens::{
    AnalysisEngine, AnalysisResult, Analyzer, App, Config, GeminiModel, HistoryStore,
    ImagePayload, Tab, record::parse_age, report, samples,
};

mod messages;
mod server;

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Woundlens assesses wound photos with a multimodal model.
struct WoundlensArgs {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Analyze(AnalyzeCommand),
    History(HistoryCommand),
    Show(ShowCommand),
    Samples(SamplesCommand),
    Report(ReportCommand),
    Serve(ServeCommand),
}

#[derive(FromArgs)]
/// Analyze a wound photo and store the result
#[argh(subcommand, name = "analyze")]
struct AnalyzeCommand {
    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,

    /// the patient's age
    #[argh(option, short = 'a')]
    age: Option<String>,
}

#[derive(FromArgs)]
/// List stored analyses, most recent first
#[argh(subcommand, name = "history")]
struct HistoryCommand {}

#[derive(FromArgs)]
/// Show one stored analysis
#[argh(subcommand, name = "show")]
struct ShowCommand {
    /// position in the history list
    #[argh(positional)]
    index: usize,
}

#[derive(FromArgs)]
/// Show the built-in example assessments
#[argh(subcommand, name = "samples")]
struct SamplesCommand {}

#[derive(FromArgs)]
/// Export a stored analysis as a PDF report
#[argh(subcommand, name = "report")]
struct ReportCommand {
    /// position in the history list
    #[argh(positional)]
    index: usize,

    /// directory to write the report into
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    output_dir: PathBuf,
}

#[derive(FromArgs)]
/// Serve the analysis workflow over HTTP
#[argh(subcommand, name = "serve")]
struct ServeCommand {
    /// the host to run the server on
    #[argh(option, default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// directory reports are written into
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    report_dir: PathBuf,
}

fn print_record(record: &AnalysisResult) {
    let date = record
        .created_at()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let age = record.age.map_or_else(|| "-".to_string(), |a| a.to_string());
    let group = record.age_group.map(|g| g.as_str()).unwrap_or("-");

    println!("Date:      {date}");
    println!("Age:       {age} ({group})");
    println!("Type:      {}", record.core.wound_type);
    println!("Stage:     {}", record.core.stage);
    println!("Severity:  {}/100", record.core.severity);
    println!("Precautions:");
    for p in &record.core.precautions {
        println!("  - {p}");
    }
    println!("Medicines & care:");
    for m in &record.core.meds {
        println!("  - {m}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let args: WoundlensArgs = argh::from_env();

    let config = Config::from_env()?;
    let mut app = App::new(HistoryStore::load(config.history_path.clone()));

    match args.command {
        Commands::Analyze(cmd) => {
            let image = ImagePayload::from_path(&cmd.image_path)?;
            let age = cmd.age.as_deref().and_then(parse_age);
            let mut analyzer = Analyzer::new(GeminiModel::new(&config)?);
            let record = app.analyze(&mut analyzer, image, age)?;
            print_record(record);
        }
        Commands::History(_) => {
            app.state_mut().select_tab(Tab::History);
            if app.history().is_empty() {
                println!("No analyses yet.");
            }
            for (i, r) in app.history().entries().iter().enumerate() {
                let date = r
                    .created_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{i:>2}  {date}  {:<20} {:<14} {:>3}",
                    r.core.wound_type.as_str(),
                    r.core.stage.as_str(),
                    r.core.severity
                );
            }
        }
        Commands::Show(cmd) => match app.view_history_entry(cmd.index) {
            Some(record) => print_record(record),
            None => return Err(woundlens::ReportError::NotFound(cmd.index).into()),
        },
        Commands::Samples(_) => {
            app.state_mut().select_tab(Tab::Samples);
            for record in samples::sample_results() {
                print_record(&record);
                println!();
            }
        }
        Commands::Report(cmd) => {
            app.state_mut().select_tab(Tab::Report);
            let record = app
                .history()
                .select_by_index(cmd.index)
                .ok_or(woundlens::ReportError::NotFound(cmd.index))?;
            let path = report::export_report(record, &cmd.output_dir)?;
            println!("Report written to {}", path.display());
        }
        Commands::Serve(cmd) => {
            // the blocking client must be built outside the async runtime
            let engine = AnalysisEngine::new(Analyzer::new(GeminiModel::new(&config)?));
            let state = Arc::new(server::ServerState {
                engine,
                app: Mutex::new(app),
                report_dir: cmd.report_dir,
            });
            let addr = format!("{}:{}", cmd.host, cmd.port);
            tokio::runtime::Runtime::new()?.block_on(server::serve(addr, state))?;
        }
    }

    Ok(())
}
