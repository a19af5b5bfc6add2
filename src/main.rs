use anyhow::Context;
use clap::{Parser, ValueEnum};
use pagediff::async_api::Browser;
use pagediff::cdp::LaunchConfig;
use pagediff::{compare, CaptureRequest, Comparison, Viewport, WaitCondition};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Capture two URLs under identical conditions and diff the screenshots.
#[derive(Parser)]
#[command(name = "pagediff", version, about)]
struct Cli {
    /// Baseline page to capture
    first_url: String,

    /// Candidate page to capture
    second_url: String,

    /// Target element selector to compare partial elements
    #[arg(long = "target")]
    target: Option<String>,

    /// Wait for network
    #[arg(long = "wait-for", value_enum, default_value_t = WaitForArg::Networkidle2)]
    wait_for: WaitForArg,

    /// Launch the browser with a visible window
    #[arg(long = "no-headless")]
    no_headless: bool,

    /// Capture only the viewport instead of the full page height
    #[arg(long = "no-full-page")]
    no_full_page: bool,

    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, default_value = "1920x1080")]
    viewport: String,

    /// Timeout for browser launch and each navigation ("500ms", "30s", "1min")
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    timeout: Duration,

    /// Output directory to save screenshots and difference
    #[arg(long = "out-dir", default_value = "./tmp")]
    out_dir: PathBuf,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum WaitForArg {
    Domcontentloaded,
    Load,
    Networkidle0,
    Networkidle2,
}

impl From<WaitForArg> for WaitCondition {
    fn from(arg: WaitForArg) -> Self {
        match arg {
            WaitForArg::Domcontentloaded => WaitCondition::DomContentLoaded,
            WaitForArg::Load => WaitCondition::Load,
            WaitForArg::Networkidle0 => WaitCondition::NetworkIdleStrict,
            WaitForArg::Networkidle2 => WaitCondition::NetworkIdleRelaxed,
        }
    }
}

/// A missing or unparsable component falls back to the default for that axis.
fn parse_viewport(size: &str) -> Viewport {
    let mut parts = size.splitn(2, 'x');
    let width = parts.next().and_then(|v| v.parse().ok()).unwrap_or(1920);
    let height = parts.next().and_then(|v| v.parse().ok()).unwrap_or(1080);
    Viewport { width, height }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.out_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            cli.out_dir.display()
        )
    })?;

    let browser = Browser::launch(LaunchConfig {
        headless: !cli.no_headless,
        window_size: parse_viewport(&cli.viewport),
        timeout: cli.timeout,
    })
    .await
    .context("Failed to launch browser")?;

    // Close the browser even when a capture fails mid-run.
    let outcome = run(&browser, &cli).await;
    if let Err(err) = browser.close().await {
        log::warn!("Failed to close browser: {err}");
    }
    outcome
}

async fn run(browser: &Browser, cli: &Cli) -> anyhow::Result<()> {
    let viewport = parse_viewport(&cli.viewport);
    let request = |url: &str| CaptureRequest {
        url: url.to_string(),
        viewport: Some(viewport),
        full_page: !cli.no_full_page,
        wait: Some(cli.wait_for.into()),
        target_selector: cli.target.clone(),
        timeout: Some(cli.timeout),
    };

    // The two captures share no state; their network waits overlap.
    let (first, second) = futures::future::try_join(
        capture_url(browser, request(&cli.first_url)),
        capture_url(browser, request(&cli.second_url)),
    )
    .await?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let first_path = cli.out_dir.join(format!("{timestamp}_1old.png"));
    let second_path = cli.out_dir.join(format!("{timestamp}_2new.png"));
    let diff_path = cli.out_dir.join(format!("{timestamp}_3diff.png"));

    std::fs::write(&first_path, &first)
        .with_context(|| format!("Failed to write {}", first_path.display()))?;
    println!(
        "Saved {:?} screenshot to {}",
        cli.first_url,
        first_path.display()
    );

    std::fs::write(&second_path, &second)
        .with_context(|| format!("Failed to write {}", second_path.display()))?;
    println!(
        "Saved {:?} screenshot to {}",
        cli.second_url,
        second_path.display()
    );

    match compare(&first, &second).context("Failed to compare screenshots")? {
        Comparison::Identical => println!("Screenshots are identical"),
        Comparison::DimensionMismatch => println!("Screenshot dimensions do not match"),
        Comparison::Different { pixels, diff } => {
            std::fs::write(&diff_path, &diff)
                .with_context(|| format!("Failed to write {}", diff_path.display()))?;
            println!(
                "Screenshots have {pixels} different pixels, difference image saved to {}",
                diff_path.display()
            );
        }
    }

    Ok(())
}

async fn capture_url(browser: &Browser, request: CaptureRequest) -> anyhow::Result<Vec<u8>> {
    let page = browser.new_page().await?;
    log::info!("Capturing {}", request.url);
    let url = request.url.clone();
    page.capture(request)
        .await
        .with_context(|| format!("Failed to capture {url}"))
}
