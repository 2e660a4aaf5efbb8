pub mod assistant;
pub mod chart;
pub mod completion;
pub mod config;
pub mod csv_import;
pub mod dataset;
pub mod db;
pub mod error;
pub mod interpret;
pub mod logging;
pub mod prompt;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

use assistant::RetroAssistant;
use chart::{ChartPoint, ChartType};
use completion::GenerativeClient;
use config::Config;
use error::{RetroError, RetroResult};
use interpret::InterpretedAnswer;
use state::DashboardState;
use store::CategoryStoreClient;
use tokio::io::{AsyncBufReadExt, BufReader};

// ============ Console commands ============

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask(String),
    Distribution,
    History,
    Chart,
    SetChartType(ChartType),
    Refresh,
    Categories,
    AddCategory(String),
    Upload { category: String, path: String },
    Help,
    Quit,
}

const HELP: &str = "\
Escribe una pregunta, o uno de estos comandos:
  :dist                 distribución por categoría
  :history              historial de preguntas
  :chart                último gráfico generado
  :type <pie|bar|line|area|scatter>
  :refresh              recargar datos
  :categories           listar categorías
  :add <Categoría>      crear categoría vacía
  :upload <Categoría> <archivo.csv>
  :quit";

/// Parse one console line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Some(Command::Ask(line.to_string())));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "dist" => Command::Distribution,
        "history" => Command::History,
        "chart" => Command::Chart,
        "refresh" => Command::Refresh,
        "categories" => Command::Categories,
        "help" => Command::Help,
        "quit" | "q" => Command::Quit,
        "type" => ChartType::from_str(arg)
            .map(Command::SetChartType)
            .ok_or_else(|| format!("Tipo de gráfico desconocido: '{}'", arg))?,
        "add" if !arg.is_empty() => Command::AddCategory(arg.to_string()),
        "upload" => {
            // Category names may contain spaces; the path is the last word.
            let (category, path) = arg
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| "Uso: :upload <Categoría> <archivo.csv>".to_string())?;
            Command::Upload {
                category: category.trim().to_string(),
                path: path.to_string(),
            }
        }
        other => return Err(format!("Comando desconocido: ':{}' (usa :help)", other)),
    };

    Ok(Some(command))
}

/// Text rendering of a series, one bar per point
pub fn render_series(title: &str, series: &[ChartPoint], chart_type: ChartType) -> String {
    let max = series.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let mut out = format!("{} [{}]\n", if title.is_empty() { "Gráfico" } else { title }, chart_type.as_str());

    for point in series {
        let width = if max > 0.0 { ((point.value / max) * 30.0).round() as usize } else { 0 };
        out.push_str(&format!("  {:<24} {:>8} {}\n", point.name, point.value, "█".repeat(width)));
    }
    out
}

// ============ Run ============

/// Run one command. Returns the text to show, or `None` when the session ends.
///
/// Every failure becomes an inline message; nothing here ends the session.
async fn execute(assistant: &RetroAssistant, command: Command) -> Option<String> {
    let output = match command {
        Command::Ask(question) => match assistant.ask(&question).await {
            Ok(outcome) => {
                let mut text = format!("\nPregunta: {}\nRespuesta:\n{}\n", question, outcome.display);
                if matches!(outcome.answer, InterpretedAnswer::ChartResult(_)) {
                    if let Some(chart) = assistant.chart() {
                        text.push_str(&render_series(&chart.title, &chart.series, assistant.chart_type()));
                    }
                }
                text
            }
            Err(e) => e.user_message(),
        },
        Command::Distribution => {
            render_series("Distribución General", &assistant.distribution(), assistant.chart_type())
        }
        Command::History => assistant
            .history()
            .iter()
            .map(|entry| format!("Pregunta: {}\nRespuesta:\n{}\n", entry.question, entry.answer))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Chart => match assistant.chart() {
            Some(chart) => render_series(&chart.title, &chart.series, assistant.chart_type()),
            None => "Aún no se ha generado ningún gráfico.".to_string(),
        },
        Command::SetChartType(chart_type) => match assistant.select_chart_type(chart_type) {
            Ok(()) => format!("Tipo de gráfico: {}", chart_type.as_str()),
            Err(e) => e.user_message(),
        },
        Command::Refresh => {
            let count = assistant.refresh_dataset().await;
            format!("{} categorías cargadas.", count)
        }
        Command::Categories => match assistant.fetch_categories().await {
            Ok(categories) => categories.join("\n"),
            Err(e) => e.user_message(),
        },
        Command::AddCategory(name) => match assistant.add_category(&name).await {
            Ok(()) => format!("Categoría '{}' creada.", name),
            Err(e) => e.user_message(),
        },
        Command::Upload { category, path } => match tokio::fs::read(&path).await {
            Ok(contents) => {
                let file_name = std::path::Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.clone());
                match assistant.upload_csv(&category, &file_name, contents).await {
                    Ok(rows) => format!("{} filas añadidas a '{}'.", rows, category),
                    Err(e) => e.user_message(),
                }
            }
            Err(e) => {
                logging::log_error(None, &format!("Cannot read {}: {}", path, e));
                RetroError::Io(e).user_message()
            }
        },
        Command::Help => HELP.to_string(),
        Command::Quit => return None,
    };
    Some(output)
}

async fn run_console(config: Config) -> RetroResult<()> {
    let storage = db::Storage::open(&config.db_path())?;
    let state = DashboardState::load(storage, config.history_limit)?;
    let assistant = RetroAssistant::new(
        CategoryStoreClient::new(&config.api_url, &config.upload_url),
        Box::new(GenerativeClient::new(&config.completion_url)),
        state,
    );

    assistant.refresh_dataset().await;
    println!("{}", render_series("Distribución General", &assistant.distribution(), assistant.chart_type()));
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(command)) => match execute(&assistant, command).await {
                Some(output) => println!("{}", output),
                None => break,
            },
            Ok(None) => {}
            Err(msg) => println!("{}", msg),
        }
    }

    Ok(())
}

pub fn run() -> RetroResult<()> {
    let config = Config::from_env()?;

    if let Err(e) = logging::init_logging(config.log_dir()) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    let _ = logging::cleanup_old_logs();

    let runtime = tokio::runtime::Runtime::new().map_err(RetroError::Io)?;
    runtime.block_on(run_console(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_questions() {
        assert_eq!(
            parse_command("  ¿Qué faltó? ").unwrap(),
            Some(Command::Ask("¿Qué faltó?".to_string()))
        );
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn colon_commands() {
        assert_eq!(parse_command(":type pie").unwrap(), Some(Command::SetChartType(ChartType::Pie)));
        assert_eq!(parse_command(":add Lo Que Gusto").unwrap(), Some(Command::AddCategory("Lo Que Gusto".to_string())));
        assert_eq!(
            parse_command(":upload Lo Que Gusto /tmp/retro.csv").unwrap(),
            Some(Command::Upload { category: "Lo Que Gusto".to_string(), path: "/tmp/retro.csv".to_string() })
        );
        assert_eq!(parse_command(":q").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn bad_commands_explain_themselves() {
        assert!(parse_command(":type donut").unwrap_err().contains("donut"));
        assert!(parse_command(":upload").is_err());
        assert!(parse_command(":add").is_err());
        assert!(parse_command(":nope").is_err());
    }

    #[test]
    fn series_rendering_scales_bars() {
        let series = vec![
            ChartPoint { name: "A".to_string(), value: 2.0 },
            ChartPoint { name: "C".to_string(), value: 1.0 },
        ];
        let text = render_series("", &series, ChartType::Bar);
        assert!(text.starts_with("Gráfico [bar]\n"));
        assert!(text.contains(&"█".repeat(30)));
        assert!(text.contains(&format!("{}\n", "█".repeat(15))));
    }

    // ============ Session ============

    use async_trait::async_trait;
    use crate::completion::CompletionProvider;

    struct FixedReply(&'static str);

    #[async_trait]
    impl CompletionProvider for FixedReply {
        async fn complete(&self, _prompt: &str) -> RetroResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn console(reply: &'static str) -> RetroAssistant {
        let state = DashboardState::load(crate::db::Storage::open_in_memory().unwrap(), None).unwrap();
        RetroAssistant::new(
            CategoryStoreClient::new("http://127.0.0.1:9/api", "http://127.0.0.1:9/upload"),
            Box::new(FixedReply(reply)),
            state,
        )
    }

    #[tokio::test]
    async fn unreadable_upload_path_keeps_session_alive() {
        let assistant = console("ok");
        let command = parse_command(":upload Lo Que Gusto /no/such/file.csv").unwrap().unwrap();

        let output = execute(&assistant, command).await.expect("session continues");

        assert!(output.starts_with("❌ Error"), "{}", output);
        assert!(execute(&assistant, Command::Help).await.is_some());
    }

    #[tokio::test]
    async fn chart_answers_render_the_stored_chart() {
        let assistant = console(r#"{"type":"chart","title":"Balance","data":[{"name":"Gustó","value":2}]}"#);
        execute(&assistant, Command::SetChartType(ChartType::Pie)).await.unwrap();

        let output = execute(&assistant, Command::Ask("desglose".to_string())).await.unwrap();

        assert!(output.contains("📊 Gráfico generado: Balance"));
        assert!(output.contains("Balance [pie]"));
        assert!(output.contains("Gustó"));
    }

    #[tokio::test]
    async fn plain_answers_do_not_render_a_chart() {
        let assistant = console("Todo bien.");
        let output = execute(&assistant, Command::Ask("¿cómo fue?".to_string())).await.unwrap();
        assert!(output.contains("Todo bien."));
        assert!(!output.contains('['));
    }

    #[tokio::test]
    async fn quit_ends_the_session() {
        assert!(execute(&console("ok"), Command::Quit).await.is_none());
    }
}
