use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wishlist_identify::analyzer::{AnalysisCoordinator, AttemptOutcome};
use wishlist_identify::cli::{Cli, Commands, OutputFormat};
use wishlist_identify::config::Config;
use wishlist_identify::photo::PhotoRef;
use wishlist_identify::remote::{HttpIdentifier, Locale};
use wishlist_identify::view::{self, AttemptKind, MenuItem};
use wishlist_identify_common::{run_cascade, BrandMatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;

    match cli.command {
        Commands::Identify {
            photo,
            country,
            currency,
            language,
            format,
            no_interactive,
        } => {
            let mut locale = config.locale();
            if let Some(country) = country.filter(|c| !c.trim().is_empty()) {
                locale.country_code = Some(country.trim().to_uppercase());
            }
            if let Some(currency) = currency {
                locale.currency_code = currency.trim().to_uppercase();
            }
            if let Some(language) = language {
                locale.language_code = language;
            }

            let photo = PhotoRef::open(&photo)?;
            let remote = HttpIdentifier::from_config(&config)?;
            let coordinator = AnalysisCoordinator::new(Arc::new(remote));
            let skip_after = Duration::from_secs(config.skip_after_seconds);

            if format == OutputFormat::Text {
                println!("🔎 wishlist-identify - 商品識別\n");
            }

            let non_interactive = no_interactive || format == OutputFormat::Json;
            run_identify(&coordinator, photo, locale, skip_after, non_interactive).await?;

            let snapshot = coordinator.snapshot();
            match format {
                OutputFormat::Text => println!("\n{}", view::describe(&snapshot)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            }
        }

        Commands::Fallback { text, brands } => {
            let matcher = match brands {
                Some(path) => load_brands(&path)?,
                None => BrandMatcher::default(),
            };

            let outcome = run_cascade(Some(&text), &matcher);
            println!("タイトル: {}", outcome.title);
            println!("信頼度: {:.0}%", outcome.result.confidence * 100.0);
            if !outcome.result.keywords.is_empty() {
                println!("キーワード: {}", outcome.result.keywords.join(", "));
            }
        }

        Commands::Config {
            set_api_key,
            set_country,
            set_currency,
            set_language,
            show,
        } => {
            let mut config = config;
            let mut changed = false;

            if let Some(key) = set_api_key {
                config.api_key = Some(key);
                println!("✔ APIキーを設定しました");
                changed = true;
            }
            if let Some(country) = set_country {
                config.set_country(&country)?;
                println!("✔ 国コードを設定しました: {}", country.trim().to_uppercase());
                changed = true;
            }
            if let Some(currency) = set_currency {
                config.set_currency(&currency)?;
                println!("✔ 通貨コードを設定しました: {}", config.currency_code);
                changed = true;
            }
            if let Some(language) = set_language {
                config.language_code = language.trim().to_string();
                println!("✔ 言語コードを設定しました: {}", config.language_code);
                changed = true;
            }

            if changed {
                config.save()?;
            }

            if show || !changed {
                println!("設定:");
                println!("  API URL: {}", config.api_url);
                let key_state = if config.get_api_key().is_ok() { "設定済み" } else { "未設定" };
                println!("  APIキー: {}", key_state);
                println!("  国コード: {}", config.country_code.as_deref().unwrap_or("未設定"));
                println!("  通貨: {}", config.currency_code);
                println!("  言語: {}", config.language_code);
                println!("  最大画像サイズ: {}px", config.max_image_size);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  スキップ表示まで: {}秒", config.skip_after_seconds);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_brands(path: &Path) -> anyhow::Result<BrandMatcher> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("ブランド一覧を読み込めません: {}", path.display()))?;
    let brands: Vec<String> = serde_json::from_str(&content)
        .with_context(|| {
            format!("ブランド一覧は文字列配列で指定してください: {}", path.display())
        })?;
    Ok(BrandMatcher::new(brands))
}

async fn run_identify(
    coordinator: &AnalysisCoordinator,
    photo: PhotoRef,
    locale: Locale,
    skip_after: Duration,
    non_interactive: bool,
) -> anyhow::Result<()> {
    if non_interactive {
        coordinator.start(photo, locale).await;
        return Ok(());
    }

    let first = AttemptKind::Start(photo, locale);
    report(view::analyze_with_spinner(coordinator, first, skip_after).await?);

    loop {
        let snapshot = coordinator.snapshot();
        println!("\n{}\n", view::describe(&snapshot));

        match view::prompt_action(&snapshot)? {
            MenuItem::Select(index) => coordinator.select_match(index)?,
            MenuItem::NoneOfThese => {
                coordinator.none_of_these();
            }
            MenuItem::EditDraft => {
                let edited = view::prompt_draft(&snapshot.draft)?;
                coordinator.edit_draft(|draft| *draft = edited);
            }
            MenuItem::Retry => {
                let outcome =
                    view::analyze_with_spinner(coordinator, AttemptKind::Retry, skip_after).await?;
                report(outcome);
            }
            MenuItem::Done => break,
        }
    }

    Ok(())
}

fn report(outcome: Option<AttemptOutcome>) {
    match outcome {
        None => println!("⏭ スキップしました。商品名を入力してください"),
        Some(AttemptOutcome::AlreadyRunning) => {
            println!("⏳ 前回の解析がまだ終わっていません。しばらくしてから再試行してください")
        }
        Some(AttemptOutcome::NotAllowed(state)) => {
            println!("この状態では解析できません: {}", state)
        }
        Some(AttemptOutcome::Completed(_)) | Some(AttemptOutcome::Discarded) => {}
    }
}
