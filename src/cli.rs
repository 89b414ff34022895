use crate::api::ReleasesIndexApi;
use crate::config::Config;
use crate::error::Result;
use crate::installer::{EnvOverrides, SdkInstaller};
use crate::models::{DirectiveKind, Quality};
use crate::platform::{OsFamily, PlatformProfile};
use crate::resolver::VersionResolver;
use crate::shell::{generate_activation_script, Shell};
use crate::utils::{confirm, print_info, print_success, print_warning};
use clap::{Parser, Subcommand};
use colored::*;

#[derive(Parser)]
#[command(name = "dotup")]
#[command(about = ".NET SDK version resolver & installer", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(skip)]
    config: Config,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a .NET SDK version
    Install {
        /// Version to install (e.g., 8.0.100, 6.0, 6.0.x, 6, 6.x)
        version: String,

        /// Build quality within the channel (channel installs, .NET 6+)
        #[arg(short, long, value_enum)]
        quality: Option<Quality>,

        /// Skip the reinstall prompt when the version is already on disk
        #[arg(short, long)]
        force: bool,
    },

    /// Resolve a version specifier without installing anything
    Resolve {
        /// Version specifier to resolve
        version: String,
    },

    /// List installed SDK versions
    #[command(alias = "ls")]
    List,
}

impl Cli {
    pub fn new(config: Config) -> Self {
        let mut cli = Self::parse();
        cli.config = config;
        cli
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Install {
                ref version,
                quality,
                force,
            } => self.install(version, quality, force).await,
            Commands::Resolve { ref version } => self.resolve(version).await,
            Commands::List => self.list(),
        }
    }

    fn resolver(&self) -> VersionResolver {
        VersionResolver::new(ReleasesIndexApi::new(
            self.config.index_url.clone(),
            self.config.retry_policy(),
        ))
    }

    fn installer(&self) -> Result<SdkInstaller> {
        let profile = PlatformProfile::current()?;
        Ok(SdkInstaller::new(
            self.config.clone(),
            profile,
            EnvOverrides::from_env(),
        ))
    }

    async fn install(
        &self,
        version_str: &str,
        quality: Option<Quality>,
        force: bool,
    ) -> Result<()> {
        let directive = self.resolver().resolve(version_str).await?;
        print_info(&format!("Resolved '{}' to {}", version_str, directive));

        let installer = self.installer()?;

        if !force {
            if let Some(existing) = installer.exact_install_path(&directive)? {
                print_warning(&format!(
                    ".NET SDK {} is already installed at {}",
                    directive.value,
                    existing.display()
                ));

                if !confirm("Reinstall?") {
                    return Ok(());
                }
            }
        }

        let installed = installer.install(&directive, quality).await?;

        print_success(&format!(
            ".NET SDK {} installed successfully",
            installed.version
        ));
        println!("  Path: {}", installed.path.display().to_string().dimmed());

        let install_dir = installer.install_dir(&directive)?;
        let shell = Shell::detect().unwrap_or(match PlatformProfile::current()?.os {
            OsFamily::Windows => Shell::PowerShell,
            _ => Shell::Bash,
        });

        println!("\n{}", "To use this SDK in your current shell:".yellow());
        println!(
            "{}",
            generate_activation_script(&install_dir, shell).dimmed()
        );

        Ok(())
    }

    async fn resolve(&self, version_str: &str) -> Result<()> {
        let directive = self.resolver().resolve(version_str).await?;

        let kind = match directive.kind {
            DirectiveKind::Exact => "exact",
            DirectiveKind::Channel => "channel",
        };

        println!("{} {}", "Kind:".green().bold(), kind.cyan());
        println!("{} {}", "Value:".green().bold(), directive.value.cyan());
        println!(
            "{} {}",
            "Supports quality:".green().bold(),
            directive.supports_quality
        );

        Ok(())
    }

    fn list(&self) -> Result<()> {
        let installer = self.installer()?;
        let installed = installer.list_installed()?;

        if installed.is_empty() {
            print_warning("No .NET SDK versions installed");
            println!("\n{}", "Install a version:".yellow());
            println!("  dotup install 8.0");
            return Ok(());
        }

        println!("{}", "Installed .NET SDKs:".green().bold());

        for sdk in installed {
            println!(
                "  {} {}",
                sdk.version.to_string().cyan(),
                format!("(installed {})", sdk.installed_at.format("%Y-%m-%d")).dimmed()
            );
        }

        Ok(())
    }
}
