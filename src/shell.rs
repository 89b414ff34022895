use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl Shell {
    pub fn detect() -> Option<Self> {
        // Try SHELL environment variable first
        if let Ok(shell) = std::env::var("SHELL") {
            if shell.contains("zsh") {
                return Some(Shell::Zsh);
            } else if shell.contains("bash") {
                return Some(Shell::Bash);
            } else if shell.contains("fish") {
                return Some(Shell::Fish);
            }
        }

        // Check for PowerShell on Windows
        #[cfg(windows)]
        {
            return Some(Shell::PowerShell);
        }

        #[cfg(not(windows))]
        None
    }
}

/// Exports making the freshly installed SDK visible to downstream
/// consumers: DOTNET_ROOT for the host resolver, PATH for the driver
pub fn generate_activation_script(install_dir: &Path, shell: Shell) -> String {
    let dir = install_dir.display();

    match shell {
        Shell::Bash | Shell::Zsh => format!(
            "export DOTNET_ROOT=\"{dir}\"\nexport PATH=\"{dir}:$PATH\"",
        ),
        Shell::Fish => format!(
            "set -gx DOTNET_ROOT \"{dir}\"\nfish_add_path \"{dir}\"",
        ),
        Shell::PowerShell => format!(
            "$env:DOTNET_ROOT = \"{dir}\"\n$env:Path = \"{dir};\" + $env:Path",
        ),
    }
}
