use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use sakura_consult::{mime_type_for_path, Consultant};
use sakura_core::{
    build_instruction, AnalysisResponse, KnowledgeItem, NewKnowledgeItem, SakuraConfig,
};
use sakura_gemini::GeminiClient;
use sakura_store::KnowledgeStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ── CLI Definition ──

#[derive(Parser)]
#[command(name = "sakura", about = "Knowledge-base-augmented beauty consultation")]
struct Cli {
    /// Directory holding the knowledge base and sakura.yaml
    /// (default: $SAKURA_DATA_DIR, then the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the knowledge base
    Kb {
        #[command(subcommand)]
        action: KbCommand,
    },
    /// Print the instructions that would be sent with a photo
    Prompt,
    /// Analyze a facial photo
    Consult {
        /// Path to a JPEG, PNG, WebP or HEIC image
        image: PathBuf,
        /// Override the mime type inferred from the file extension
        #[arg(long)]
        mime: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum KbCommand {
    /// List all tips, newest first
    List,
    /// Add a tip
    Add {
        /// Skin, Makeup, Health or General
        #[arg(long, default_value = "General")]
        category: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Delete a tip by id
    Delete { id: String },
    /// Print the context block injected into the prompt
    Context,
}

// ── Helpers ──

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os("SAKURA_DATA_DIR") {
        return Ok(PathBuf::from(path));
    }
    dirs::data_dir()
        .map(|dir| dir.join("sakura"))
        .context("could not determine a data directory; pass --data-dir")
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn render_items(items: &[KnowledgeItem]) -> String {
    if items.is_empty() {
        return "knowledge base is empty\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "{}  [{}] {}", item.id, item.category, item.title);
        let _ = writeln!(out, "    {}", item.content);
    }
    out
}

fn render_list(out: &mut String, heading: &str, entries: &[String]) {
    let _ = writeln!(out, "  {}:", heading);
    if entries.is_empty() {
        let _ = writeln!(out, "    (none)");
    }
    for entry in entries {
        let _ = writeln!(out, "    - {}", entry);
    }
}

fn render_analysis(analysis: &AnalysisResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Your Beauty Prescription");
    let _ = writeln!(out, "\n{}\n", analysis.overall_impression);

    let skin = &analysis.skin_analysis;
    let _ = writeln!(out, "Skin Analysis");
    let _ = writeln!(out, "  Tone: {}", skin.tone);
    let _ = writeln!(out, "  Texture: {}", skin.texture);
    render_list(&mut out, "Concerns", &skin.concerns);

    let _ = writeln!(out, "\nBeauty Advice");
    render_list(&mut out, "Skincare", &analysis.beauty_advice.skincare_routine);
    render_list(&mut out, "Makeup", &analysis.beauty_advice.makeup_tips);

    let _ = writeln!(out, "\nHealth & Lifestyle");
    render_list(&mut out, "Dietary", &analysis.health_advice.dietary);
    render_list(&mut out, "Lifestyle Habits", &analysis.health_advice.lifestyle);
    out
}

fn render_config(config: &SakuraConfig, data_dir: &Path) -> String {
    let key = match config.resolve_api_key() {
        Ok(key) => mask_key(&key),
        Err(_) => "(not set)".to_string(),
    };
    format!(
        "data_dir: {}\nmodel: {}\napi_base: {}\ntimeout_secs: {}\napi_key: {}\n",
        data_dir.display(),
        config.model,
        config.api_base,
        config.timeout_secs,
        key
    )
}

fn kb_command(store: &KnowledgeStore, action: KbCommand) -> Result<String> {
    match action {
        KbCommand::List => Ok(render_items(&store.list()?)),
        KbCommand::Add {
            category,
            title,
            content,
        } => {
            let item = store.add(NewKnowledgeItem::parse(&category, &title, &content)?)?;
            Ok(format!("added {} [{}] {}\n", item.id, item.category, item.title))
        }
        KbCommand::Delete { id } => {
            if store.delete(&id)? {
                Ok(format!("deleted {}\n", id))
            } else {
                Ok(format!("no item with id {}\n", id))
            }
        }
        KbCommand::Context => {
            let context = store.context()?;
            Ok(if context.is_empty() {
                context
            } else {
                format!("{}\n", context)
            })
        }
    }
}

async fn consult(
    store: &KnowledgeStore,
    config: &SakuraConfig,
    image_path: &Path,
    mime: Option<String>,
) -> Result<String> {
    let mime_type = match mime {
        Some(m) => m,
        None => mime_type_for_path(image_path)
            .map(String::from)
            .with_context(|| {
                format!(
                    "cannot infer image type of {}; pass --mime",
                    image_path.display()
                )
            })?,
    };
    let image = fs::read(image_path)
        .with_context(|| format!("reading image: {}", image_path.display()))?;

    let client = GeminiClient::from_config(config)?;
    let consultant = Consultant::new(store, client);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    eprintln!("Consulting the AI...");
    match consultant
        .analyze_with_cancel(image, &mime_type, &cancel)
        .await
    {
        Ok(analysis) => Ok(render_analysis(&analysis)),
        Err(e) if e.is_analysis_failure() => {
            log::error!("analysis failed: {}", e);
            Err(anyhow!("Analysis failed. Please try again."))
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir)?;
    let config = SakuraConfig::load(&data_dir)?;
    let store = KnowledgeStore::open(&data_dir);
    log::debug!("using data dir {}", data_dir.display());

    let output = match cli.command {
        Commands::Kb { action } => kb_command(&store, action)?,
        Commands::Prompt => {
            let instruction = build_instruction(&store.context()?);
            format!(
                "--- system instruction ---\n{}\n--- user prompt ---\n{}\n",
                instruction.system_instruction, instruction.user_prompt
            )
        }
        Commands::Consult { image, mime } => consult(&store, &config, &image, mime).await?,
        Commands::Config => render_config(&config, &data_dir),
    };

    print!("{}", output);
    Ok(())
}

// ── Main ──

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use sakura_core::{BeautyAdvice, HealthAdvice, SkinAnalysis};
    use tempfile::TempDir;

    fn sample_analysis() -> AnalysisResponse {
        AnalysisResponse {
            skin_analysis: SkinAnalysis {
                tone: "fair".to_string(),
                texture: "smooth".to_string(),
                concerns: vec!["slight dryness".to_string()],
            },
            beauty_advice: BeautyAdvice {
                makeup_tips: vec![],
                skincare_routine: vec!["double cleanse".to_string(), "hydrating toner".to_string()],
            },
            health_advice: HealthAdvice {
                dietary: vec!["green tea".to_string()],
                lifestyle: vec!["sleep before midnight".to_string()],
            },
            overall_impression: "Radiant and healthy.".to_string(),
        }
    }

    #[test]
    fn test_cli_parses_kb_add() {
        let cli = Cli::try_parse_from([
            "sakura",
            "--data-dir",
            "/tmp/sakura",
            "kb",
            "add",
            "--category",
            "skin",
            "--title",
            "Sunscreen",
            "--content",
            "SPF daily",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/sakura")));
        match cli.command {
            Commands::Kb {
                action: KbCommand::Add { category, title, .. },
            } => {
                assert_eq!(category, "skin");
                assert_eq!(title, "Sunscreen");
            }
            _ => panic!("expected kb add"),
        }
    }

    #[test]
    fn test_cli_add_defaults_to_general() {
        let cli =
            Cli::try_parse_from(["sakura", "kb", "add", "--title", "T", "--content", "C"]).unwrap();
        match cli.command {
            Commands::Kb {
                action: KbCommand::Add { category, .. },
            } => assert_eq!(category, "General"),
            _ => panic!("expected kb add"),
        }
    }

    #[test]
    fn test_kb_commands_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = KnowledgeStore::open(tmp.path());

        let listed = kb_command(&store, KbCommand::List).unwrap();
        assert!(listed.contains("Double Cleansing"));

        let added = kb_command(
            &store,
            KbCommand::Add {
                category: "makeup".to_string(),
                title: "Blush".to_string(),
                content: "Dab on the apples of the cheeks.".to_string(),
            },
        )
        .unwrap();
        assert!(added.starts_with("added "));
        let id = store.list().unwrap()[0].id.clone();

        let context = kb_command(&store, KbCommand::Context).unwrap();
        assert!(context.starts_with("[Makeup] Blush: Dab on the apples of the cheeks.\n"));

        let deleted = kb_command(&store, KbCommand::Delete { id: id.clone() }).unwrap();
        assert_eq!(deleted, format!("deleted {}\n", id));
        let again = kb_command(&store, KbCommand::Delete { id: id.clone() }).unwrap();
        assert_eq!(again, format!("no item with id {}\n", id));
    }

    #[test]
    fn test_kb_add_rejects_unknown_category() {
        let tmp = TempDir::new().unwrap();
        let store = KnowledgeStore::open(tmp.path());
        let result = kb_command(
            &store,
            KbCommand::Add {
                category: "Haircare".to_string(),
                title: "T".to_string(),
                content: "C".to_string(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_render_analysis_sections() {
        let out = render_analysis(&sample_analysis());
        assert!(out.starts_with("Your Beauty Prescription\n"));
        assert!(out.contains("Radiant and healthy."));
        assert!(out.contains("  Tone: fair\n"));
        assert!(out.contains("    - double cleanse\n    - hydrating toner\n"));
        assert!(out.contains("  Makeup:\n    (none)\n"));
        assert!(out.contains("  Lifestyle Habits:\n    - sleep before midnight\n"));

        let skincare = out.find("Skincare").unwrap();
        let dietary = out.find("Dietary").unwrap();
        assert!(skincare < dietary);
    }

    #[test]
    fn test_render_items_empty() {
        assert_eq!(render_items(&[]), "knowledge base is empty\n");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("AIzaSyExample1234"), "****1234");
        assert_eq!(mask_key("abc"), "****");
    }

    #[test]
    fn test_resolve_data_dir_prefers_flag() {
        let dir = resolve_data_dir(Some(PathBuf::from("/srv/sakura"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/sakura"));
    }

    #[tokio::test]
    async fn test_consult_requires_known_image_type() {
        let tmp = TempDir::new().unwrap();
        let store = KnowledgeStore::open(tmp.path());
        let config = SakuraConfig {
            api_key: Some("test-key".to_string()),
            ..SakuraConfig::default()
        };
        let image = tmp.path().join("face.bmp");
        fs::write(&image, [0u8; 8]).unwrap();

        let err = consult(&store, &config, &image, None).await.unwrap_err();
        assert!(err.to_string().contains("--mime"));
    }
}
