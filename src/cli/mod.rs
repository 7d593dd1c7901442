//! CLI command implementations for abcxyz.
//!
//! Provides subcommand handlers for:
//! - `abcxyz upload FILE` / `abcxyz delete FILE`: send a workbook
//! - `abcxyz results` / `stats` / `matrix`: show what the backend holds
//! - `abcxyz check`: backend reachability, config and log status
//! - `abcxyz watch`: auto-refresh the results table
//! - `abcxyz chat`: talk to the analysis assistant
//! - `abcxyz serve`: local dashboard
//! - `abcxyz log`: recent activity
//! - `abcxyz config show|init|set|reset`: configuration management

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use colored::Colorize;

use crate::analytics::{ActivityEntry, ActivityLog};
use crate::api::{self, ApiClient, Backend};
use crate::chat::{ChatSession, HistoryStore, Navigation, Sender, WELCOME_TEXT, quick_replies};
use crate::config::{self, AbcxyzConfig};
use crate::loader::VisualizationLoader;
use crate::model::{ABC_CLASSES, MatrixView, Summary, XYZ_CLASSES};
use crate::notify::{ConsoleNotifier, Notifier};
use crate::refresh::{self, AutoRefresh, TickOutcome};
use crate::render::terminal::truncate;
use crate::render::{ResultsView, TerminalView, group_digits};
use crate::ui::LEGEND;
use crate::upload::{DeleteOutcome, UploadController, UploadFile, UploadOutcome};
use crate::web::{self, Dashboard};

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Resolved config plus the client built from it.
struct Context {
    config: AbcxyzConfig,
    client: ApiClient,
    log: ActivityLog,
}

impl Context {
    fn load() -> Self {
        let config = config::load();
        let client = ApiClient::from_config(&config.api);
        let log = ActivityLog::from_config(&config.logging);
        Self {
            config,
            client,
            log,
        }
    }
}

fn elapsed_ms(start: Instant) -> Option<u64> {
    u64::try_from(start.elapsed().as_millis()).ok()
}

// ---------------------------------------------------------------------------
// abcxyz upload / delete
// ---------------------------------------------------------------------------

/// Upload a workbook and show the analysis.
pub fn run_upload(path: &Path) -> Result<()> {
    let ctx = Context::load();
    let file = UploadFile::from_path(path)?;
    let notifier = ConsoleNotifier::default();
    let mut view = TerminalView::default();
    let controller = UploadController::new(
        &ctx.client,
        &notifier,
        &ctx.config.upload,
        ctx.config.api.analysis_limit,
    );

    let start = Instant::now();
    let outcome = controller.submit_file(&file, &mut view);

    let mut entry = ActivityEntry::new("upload", false);
    entry.target = Some(file.name.clone());
    entry.duration_ms = elapsed_ms(start);
    let failed = match outcome {
        UploadOutcome::Uploaded(result) => {
            entry.success = true;
            entry.rows = Some(result.stats.total_items);
            entry.detail = Some(result.message);
            false
        }
        UploadOutcome::Rejected(e) => {
            entry.detail = Some(e.to_string());
            true
        }
        UploadOutcome::Failed(msg) => {
            entry.detail = Some(msg);
            true
        }
    };
    ctx.log.record(&entry);

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Delete every item listed in a workbook.
pub fn run_delete(path: &Path) -> Result<()> {
    let ctx = Context::load();
    let file = UploadFile::from_path(path)?;
    let notifier = ConsoleNotifier::default();
    let mut view = TerminalView::default();
    let controller = UploadController::new(
        &ctx.client,
        &notifier,
        &ctx.config.upload,
        ctx.config.api.analysis_limit,
    );

    let start = Instant::now();
    let outcome = controller.delete_file(&file, &mut view);

    let mut entry = ActivityEntry::new("delete", false);
    entry.target = Some(file.name.clone());
    entry.duration_ms = elapsed_ms(start);
    let failed = match outcome {
        DeleteOutcome::Deleted(result) => {
            entry.success = true;
            entry.rows = Some(result.deleted_store);
            false
        }
        DeleteOutcome::Rejected(e) => {
            entry.detail = Some(e.to_string());
            true
        }
        DeleteOutcome::Failed(msg) => {
            entry.detail = Some(msg);
            true
        }
    };
    ctx.log.record(&entry);

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// abcxyz results
// ---------------------------------------------------------------------------

/// Show the current analysis rows, summary and available charts.
pub fn run_results(format: OutputFormat) -> Result<()> {
    let ctx = Context::load();
    let notifier = ConsoleNotifier {
        quiet: format != OutputFormat::Table,
    };
    let loader = VisualizationLoader::new(&ctx.client, &notifier, ctx.config.api.analysis_limit);

    let start = Instant::now();
    let loaded = loader.fetch(None, None);

    let mut entry = ActivityEntry::new("load", loaded.report.rows > 0);
    entry.target = Some(ctx.client.base_url().to_string());
    entry.rows = Some(loaded.report.rows);
    entry.duration_ms = elapsed_ms(start);
    ctx.log.record(&entry);

    match format {
        OutputFormat::Table => loaded.render(&mut TerminalView::default()),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "rows": loaded.records,
                "summary": Summary::from_records(&loaded.records),
                "charts": loaded.charts.ordered().into_iter().map(|(k, _)| k).collect::<Vec<_>>(),
                "source": loaded.report.rows_source,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            println!("rank,name,revenue,abc,xyz,abc_xyz");
            for (i, r) in loaded.records.iter().enumerate() {
                println!(
                    "{},{},{:.2},{},{},{}",
                    r.display_rank(i),
                    csv_field(&r.name),
                    r.revenue,
                    r.abc,
                    r.xyz,
                    r.abc_xyz,
                );
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// abcxyz stats
// ---------------------------------------------------------------------------

/// Show the server-side statistics used by auto-refresh.
pub fn run_stats(format: OutputFormat) -> Result<()> {
    let ctx = Context::load();
    let stats = match ctx.client.stats() {
        Ok(stats) => stats,
        Err(e) => {
            ConsoleNotifier::default().diagnostic(&format!("stats: {e:#}"));
            anyhow::bail!(api::user_message(&e, api::CONNECTION_FAILED));
        }
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Csv => {
            println!("group,category,count,pct");
            for (group, counts) in [("abc", &stats.summary.abc), ("xyz", &stats.summary.xyz)] {
                for (category, count) in counts {
                    println!(
                        "{group},{category},{count},{:.1}",
                        stats.summary.pct(*count)
                    );
                }
            }
        }
        OutputFormat::Table => {
            println!("{}", "Server Statistics".bold().cyan());
            println!("{}", "=".repeat(50));
            let updated = stats
                .last_update
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("  {} {}", "Last update:".bold(), updated);
            TerminalView::default().render_summary(&stats.summary);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// abcxyz check
// ---------------------------------------------------------------------------

/// Check backend reachability, stored data, config files and the log.
pub fn run_check() -> Result<()> {
    let ctx = Context::load();

    println!("{}", "abcxyz Check".bold().cyan());
    println!("{}", "=".repeat(40));

    print_check_item("Backend", true, ctx.client.base_url());

    match ctx.client.check_data() {
        Ok(presence) => {
            let detail = match (presence.has_data, presence.count) {
                (true, Some(n)) => format!("{} rows stored", format_number(n)),
                (true, None) => "data stored".to_string(),
                (false, _) => "reachable, no data yet".to_string(),
            };
            print_check_item("Analysis data", presence.has_data, &detail);
        }
        Err(e) => print_check_item(
            "Analysis data",
            false,
            &api::user_message(&e, api::CONNECTION_FAILED),
        ),
    }

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_check_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.abcxyz/config.toml found"
        } else {
            "not found (run `abcxyz config init` to create)"
        },
    );
    print_check_item(
        "Project config",
        project_exists,
        if project_exists {
            ".abcxyz.toml found"
        } else {
            "none (optional)"
        },
    );

    let log_entries = ctx.log.read_all().len();
    print_check_item(
        "Activity log",
        ctx.config.logging.enabled,
        &if ctx.config.logging.enabled {
            format!("{log_entries} entries")
        } else {
            "disabled".to_string()
        },
    );

    Ok(())
}

fn print_check_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<18} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// abcxyz matrix
// ---------------------------------------------------------------------------

/// Print the ABC×XYZ matrix with row and column totals.
pub fn run_matrix(session: Option<&str>, format: OutputFormat) -> Result<()> {
    let ctx = Context::load();
    let payload = match ctx.client.visualization(session) {
        Ok(payload) => payload,
        Err(e) => {
            ConsoleNotifier::default().diagnostic(&format!("matrix: {e:#}"));
            anyhow::bail!(api::user_message(&e, api::CONNECTION_FAILED));
        }
    };
    let matrix = MatrixView::from_payload(&payload);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&matrix)?),
        OutputFormat::Csv => {
            println!("abc,x,y,z,total");
            for (r, abc) in ABC_CLASSES.iter().enumerate() {
                let row = matrix.counts[r];
                println!("{abc},{},{},{},{}", row[0], row[1], row[2], matrix.row_total(r));
            }
        }
        OutputFormat::Table => print_matrix_table(&matrix),
    }

    Ok(())
}

fn print_matrix_table(matrix: &MatrixView) {
    println!("{}", "ABC-XYZ Matrix".bold().cyan());
    println!("{}", "=".repeat(40));
    print!("  {:<6}", "");
    for xyz in XYZ_CLASSES {
        print!("{:>8}", xyz.bold());
    }
    println!("{:>8}", "Total".dimmed());
    println!("  {}", "-".repeat(38));

    for (r, abc) in ABC_CLASSES.iter().enumerate() {
        print!("  {:<6}", abc.bold());
        for c in 0..XYZ_CLASSES.len() {
            print!("{:>8}", matrix.counts[r][c]);
        }
        println!("{:>8}", matrix.row_total(r).to_string().dimmed());
    }

    println!("  {}", "-".repeat(38));
    print!("  {:<6}", "Total".dimmed());
    for c in 0..XYZ_CLASSES.len() {
        print!("{:>8}", matrix.col_total(c));
    }
    println!("{:>8}", matrix.total().to_string().bold());
}

// ---------------------------------------------------------------------------
// abcxyz watch
// ---------------------------------------------------------------------------

/// Show the results and reload them whenever the server reports an update.
pub fn run_watch(interval_ms: Option<u64>) -> Result<()> {
    let ctx = Context::load();
    let notifier = ConsoleNotifier::default();
    let limit = ctx.config.api.analysis_limit;

    let mut view = TerminalView::default();
    let loader = VisualizationLoader::new(&ctx.client, &notifier, limit);
    if loader.recover(&mut view).is_none() {
        view.render_table(&[]);
    }

    let interval = interval_ms.unwrap_or(ctx.config.refresh.interval_ms);
    let mut auto = AutoRefresh::new(Duration::from_millis(interval));
    let state = auto.state();
    let client = ctx.client.clone();
    let log = ctx.log.clone();

    auto.start(move || {
        let notifier = ConsoleNotifier::default();
        let mut view = TerminalView::default();
        let start = Instant::now();
        if let TickOutcome::Reloaded(report) =
            refresh::tick(&client, &notifier, &state, limit, &mut view)
        {
            let mut entry = ActivityEntry::new("refresh", true);
            entry.rows = Some(report.rows);
            entry.duration_ms = elapsed_ms(start);
            log.record(&entry);
        }
    });

    println!();
    println!(
        "  {}",
        format!(
            "Checking for updates every {}s. Press Enter to stop.",
            auto.interval().as_secs_f64()
        )
        .dimmed()
    );
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);

    auto.stop(&notifier);
    Ok(())
}

// ---------------------------------------------------------------------------
// abcxyz chat
// ---------------------------------------------------------------------------

/// Interactive chat with the analysis assistant.
///
/// `/quick` lists suggested questions, `/clear` empties the history,
/// `/quit` (or end of input) leaves.
pub fn run_chat(fresh: bool) -> Result<()> {
    let cfg = config::load();
    let store = HistoryStore::new();
    let mut chat = ChatSession::new(&cfg.chat);

    if cfg.chat.persist_history {
        let navigation = if fresh {
            Navigation::Reload
        } else {
            Navigation::Navigate
        };
        chat.restore(store.restore(navigation));
    }

    println!("{}", "Analysis Assistant".bold().cyan());
    println!("{}", "=".repeat(40));
    if chat.history().is_empty() {
        println!("  {}", WELCOME_TEXT.dimmed());
    }
    for msg in chat.history() {
        print_chat_message(msg);
    }
    println!("  {}", "/quick for suggestions, /clear to reset, /quit to leave".dimmed());

    let stdin = std::io::stdin();
    loop {
        print!("{} ", "›".cyan().bold());
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "/quit" | "/exit" => break,
            "/quick" => {
                for (i, prompt) in quick_replies().iter().enumerate() {
                    println!("  {} {}", format!("{}.", i + 1).dimmed(), prompt);
                }
                continue;
            }
            "/clear" => {
                let notice = chat.clear();
                println!("  {}", WELCOME_TEXT.dimmed());
                print_chat_message(&notice);
            }
            input => {
                // a bare number picks a quick reply
                let input = input
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| quick_replies().get(n.wrapping_sub(1)).copied())
                    .unwrap_or(input);
                let Some(reply) = chat.send_message(input) else {
                    continue;
                };
                print!("  {}", "…".dimmed());
                let _ = std::io::stdout().flush();
                std::thread::sleep(reply.delay);
                print!("\r");
                let msg = chat.deliver(reply).clone();
                print_chat_message(&msg);
            }
        }

        if cfg.chat.persist_history {
            let _ = store.save(chat.history());
        }
    }

    Ok(())
}

fn print_chat_message(msg: &crate::chat::ChatMessage) {
    match msg.sender {
        Sender::User => println!("  {} {}", msg.time_label().dimmed(), msg.text.bold()),
        Sender::Bot => println!("  {} {}", msg.time_label().dimmed(), msg.text.green()),
    }
}

// ---------------------------------------------------------------------------
// abcxyz serve
// ---------------------------------------------------------------------------

/// Start the local dashboard.
pub fn run_serve(addr: Option<&str>) -> Result<()> {
    let cfg = config::load();
    let addr = addr.map(str::to_string).unwrap_or_else(|| cfg.web.addr.clone());
    let client = ApiClient::from_config(&cfg.api);
    println!("  {} {}", "Backend:".dimmed(), client.base_url());
    web::serve(&addr, Dashboard::new(Box::new(client), cfg))
}

// ---------------------------------------------------------------------------
// abcxyz log
// ---------------------------------------------------------------------------

/// Show recent activity log entries, newest first.
pub fn run_log(limit: usize, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let entries = ActivityLog::from_config(&cfg.logging).read_recent(limit);

    if entries.is_empty() {
        println!("{}", "No activity yet.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Csv => {
            println!("timestamp,action,target,success,rows,duration_ms,detail");
            for e in &entries {
                println!(
                    "{},{},{},{},{},{},{}",
                    e.timestamp,
                    e.action,
                    csv_field(e.target.as_deref().unwrap_or("")),
                    e.success,
                    e.rows.map(|n| n.to_string()).unwrap_or_default(),
                    e.duration_ms.map(|n| n.to_string()).unwrap_or_default(),
                    csv_field(e.detail.as_deref().unwrap_or("")),
                );
            }
        }
        OutputFormat::Table => {
            println!("{}", "Recent Activity".bold().cyan());
            println!("{}", "=".repeat(72));
            println!(
                "  {:<19} {:<8} {:<26} {:>7} Status",
                "Time", "Action", "Target", "Rows"
            );
            println!("  {}", "-".repeat(70));
            for e in &entries {
                let time = chrono::DateTime::parse_from_rfc3339(&e.timestamp)
                    .map(|t| {
                        t.with_timezone(&chrono::Local)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string()
                    })
                    .unwrap_or_else(|_| e.timestamp.clone());
                let status = if e.success {
                    "ok".green()
                } else {
                    "failed".red()
                };
                println!(
                    "  {:<19} {:<8} {:<26} {:>7} {}",
                    time,
                    e.action,
                    truncate(e.target.as_deref().unwrap_or("-"), 26),
                    e.rows.map(format_number).unwrap_or_default(),
                    status,
                );
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// abcxyz config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective abcxyz Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    let mark = |found: bool| if found { "✓".green() } else { "·".dimmed() };
    println!(
        "  {} {}",
        mark(global_exists),
        if global_exists {
            "~/.abcxyz/config.toml"
        } else {
            "~/.abcxyz/config.toml (not found)"
        }
        .dimmed()
    );
    println!(
        "  {} {}",
        mark(project_exists),
        if project_exists {
            ".abcxyz.toml"
        } else {
            ".abcxyz.toml (not found)"
        }
        .dimmed()
    );
    println!(
        "  {} {}",
        "·".dimmed(),
        "ABCXYZ_* environment variables".dimmed()
    );

    println!();
    println!("{}", "Category legend".dimmed());
    for (class, text) in LEGEND {
        println!("  {} {}", class.bold(), text.dimmed());
    }

    Ok(())
}

/// Initialize a default config file at `~/.abcxyz/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!("  {}", "Edit the file to point abcxyz at your backend.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
fn format_number(n: usize) -> String {
    group_digits(&n.to_string(), ',')
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field("Bolt M8"), "Bolt M8");
        assert_eq!(csv_field("Bolt, M8"), "\"Bolt, M8\"");
        assert_eq!(csv_field("2\" pipe"), "\"2\"\" pipe\"");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }
}
