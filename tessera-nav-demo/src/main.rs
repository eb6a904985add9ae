use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tessera_nav::{
    NavConfig, NavEngine, Route, Screen,
    testing::{RecordingSurface, SurfaceCall},
};
use tracing::info;

/// Drive a navigation engine against an in-memory surface and print what the
/// platform would have been asked to do.
#[derive(Parser)]
#[command(name = "tessera-nav-demo")]
#[command(version, about = "Headless walkthrough of tessera-nav", long_about = None)]
struct Cli {
    /// Mirror navigation log lines to the console
    #[arg(short, long)]
    debug_logging: bool,
    /// Animate the initial mount
    #[arg(long)]
    animate_initial: bool,
    /// Title shown while no screen owns the bar title
    #[arg(long, default_value = "")]
    default_title: String,
    /// Initial routes, bottom first
    #[arg(short, long = "initial", value_delimiter = ',', default_value = "home")]
    initial: Vec<String>,
    /// Steps: push:KEY, replace:KEY, pop, back, popto:KEY, popto-incl:KEY,
    /// root, clear, force-title:TEXT, cycle
    steps: Vec<Step>,
}

#[derive(Clone, Debug)]
enum Step {
    Push(String),
    Replace(String),
    Pop,
    Back,
    PopTo { key: String, inclusive: bool },
    Root,
    Clear,
    ForceTitle(String),
    Cycle,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(step: &str) -> Result<Self> {
        let (verb, value) = match step.split_once(':') {
            Some((verb, value)) => (verb, Some(value)),
            None => (step, None),
        };
        let arg = |verb: &str| -> Result<String> {
            value
                .filter(|arg| !arg.is_empty())
                .map(str::to_owned)
                .with_context(|| format!("`{verb}` needs an argument, as in `{verb}:value`"))
        };
        Ok(match verb {
            "push" => Step::Push(arg(verb)?),
            "replace" => Step::Replace(arg(verb)?),
            "pop" => Step::Pop,
            "back" => Step::Back,
            "popto" => Step::PopTo {
                key: arg(verb)?,
                inclusive: false,
            },
            "popto-incl" => Step::PopTo {
                key: arg(verb)?,
                inclusive: true,
            },
            "root" => Step::Root,
            "clear" => Step::Clear,
            "force-title" => Step::ForceTitle(arg(verb)?),
            "cycle" => Step::Cycle,
            other => bail!("unknown step `{other}`"),
        })
    }
}

type Engine = NavEngine<String, RecordingSurface<String>>;

fn route(key: &str) -> Route<String> {
    let mut title = key.to_owned();
    if let Some(first) = title.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    Route::new(key.to_owned(), title)
}

fn screen(key: &str) -> Screen<String> {
    let screen = Screen::new(format!("<{key} view>")).nav_title(route(key).title());
    if key.starts_with("full") {
        screen.nav_bar_hidden(true)
    } else {
        screen
    }
}

fn init_tracing() {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            tracing_subscriber::EnvFilter::new("error,tessera_nav=info,tessera_nav_demo=info")
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn run_step(engine: &mut Engine, step: &Step) -> Result<()> {
    match step {
        Step::Push(key) => engine.push(route(key)),
        Step::Replace(key) => engine.replace(route(key), true),
        Step::Pop => engine.pop(true),
        Step::Back => {
            let Some(shown) = engine.surface_mut().simulate_back_gesture() else {
                bail!("back gesture needs at least two native screens");
            };
            engine.did_finish_showing(shown, true);
        }
        Step::PopTo { key, inclusive } => engine.pop_to(&route(key), *inclusive, true),
        Step::Root => engine.pop_to_root(true),
        Step::Clear => engine.clear(true),
        Step::ForceTitle(title) => engine.chrome().set_title(title.as_str()),
        Step::Cycle => {
            let corrected = engine.run_cycle();
            info!(corrected, "ran UI cycle");
        }
    }
    Ok(())
}

fn describe(call: &SurfaceCall) -> String {
    match call {
        SurfaceCall::Push {
            id,
            title,
            animated,
        } => format!("push {id} '{title}' (animated: {animated})"),
        SurfaceCall::PopTo { id, animated } => format!("pop to {id} (animated: {animated})"),
        SurfaceCall::Clear => "clear".to_owned(),
        SurfaceCall::Replace {
            retained,
            ids,
            animated,
        } => format!("replace above {retained} with {ids:?} (animated: {animated})"),
        SurfaceCall::Chrome(chrome) => format!(
            "paint bar '{}' hidden={} tint={:?}",
            chrome.title,
            chrome.bar_hidden,
            chrome.back_button_tint.to_array()
        ),
    }
}

fn report(engine: &mut Engine, label: &str) {
    let calls = engine.surface_mut().take_calls();
    let routes: Vec<&str> = engine
        .routes()
        .iter()
        .map(|route| route.key().as_str())
        .collect();
    println!("== {label}");
    for call in &calls {
        println!("   native: {}", describe(call));
    }
    println!("   routes: {routes:?}");
    println!("   screens: {:?}", engine.surface().titles());
    println!(
        "   bar: '{}' (hidden: {})",
        engine.chrome().title(),
        engine.chrome().bar_hidden()
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = NavConfig {
        debug_logging: cli.debug_logging,
        animate_initial_mount: cli.animate_initial,
        default_title: cli.default_title,
        ..NavConfig::default()
    };
    let mut engine: Engine =
        NavEngine::builder(RecordingSurface::new(), |key: &String| screen(key))
            .config(config)
            .initial_stack(cli.initial.iter().map(|key| route(key)))
            .build();
    report(&mut engine, "mount");

    for step in &cli.steps {
        run_step(&mut engine, step)?;
        report(&mut engine, &format!("{step:?}"));
    }
    Ok(())
}
