use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use kiln_config::Environment;

/// Available kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the application
    ///
    /// Compiles every source directory into `<build_root>/<name>/`, writes
    /// the shell page to `<build_root>/index.html`, then applies banners,
    /// minification and the post-build step.
    Build(BuildArgs),

    /// Start the development server
    ///
    /// Serves the source tree, compiling each requested file on the fly,
    /// together with the unit-test harness, coverage assets, the client
    /// error sink and fixture-mocked API paths.
    Dev(DevArgs),

    /// Run the unit tests in a browser
    ///
    /// Starts the dev server, opens the harness in auto-run mode and exits
    /// with status 0 only when the posted report has no failures.
    Ci(CiArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Build name, used as the output directory name
    ///
    /// Defaults to the current timestamp in milliseconds. Building twice
    /// with the same name is refused.
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Configuration environment (default, dev, tests)
    #[arg(short, long, default_value = "default", value_name = "ENV")]
    pub env: Environment,

    /// Skip the external minifier
    #[arg(long)]
    pub no_minify: bool,

    /// Application root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DevArgs {
    /// Port to listen on (overrides `port` in kiln.toml)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Configuration environment (default, dev, tests)
    #[arg(short, long, default_value = "dev", value_name = "ENV")]
    pub env: Environment,

    /// Application root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CiArgs {
    /// Browser to launch (overrides `ci.browser` in kiln.toml)
    #[arg(short, long, value_enum)]
    pub browser: Option<BrowserKind>,

    /// Run the framework's own test suite instead of the application's
    #[arg(long)]
    pub framework: bool,

    /// Run the browser headless
    #[arg(long)]
    pub headless: bool,

    /// Seconds to wait for the report (overrides `ci.timeout_secs`)
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Port to listen on (overrides `port` in kiln.toml)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Configuration environment (default, dev, tests)
    #[arg(short, long, default_value = "tests", value_name = "ENV")]
    pub env: Environment,

    /// Application root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

/// Browsers the CI runner knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowserKind {
    Chromium,
    Chrome,
    #[value(alias = "iceweasel")]
    Firefox,
}

impl BrowserKind {
    /// Parse the `ci.browser` config value.
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }

    /// Executable names to try, in order.
    pub fn programs(self) -> &'static [&'static str] {
        match self {
            BrowserKind::Chromium => &["chromium-browser", "chromium"],
            BrowserKind::Chrome => &["google-chrome", "google-chrome-stable"],
            BrowserKind::Firefox => &["firefox", "iceweasel"],
        }
    }

    /// Arguments that open `url` in a fresh private session.
    pub fn args(self, url: &str, headless: bool) -> Vec<String> {
        let mut args = Vec::new();
        match self {
            BrowserKind::Chromium | BrowserKind::Chrome => {
                args.push("--incognito".to_string());
                if headless {
                    args.push("--headless=new".to_string());
                }
            }
            BrowserKind::Firefox => {
                if headless {
                    args.push("-headless".to_string());
                }
            }
        }
        args.push(url.to_string());
        args
    }
}
