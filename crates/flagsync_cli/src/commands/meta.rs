use std::io::Write;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::Cli;

fn write_completions(shell: Shell, out: &mut impl Write) {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin, out);
}

fn write_man_page(out: &mut impl Write) -> std::io::Result<()> {
    clap_mangen::Man::new(Cli::command()).render(out)
}

/// Print a completion script for `shell` to stdout.
pub(crate) fn handle_completions(shell: Shell) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout().lock();
    write_completions(shell, &mut stdout);
    stdout.flush()?;
    Ok(())
}

/// Print the top-level man page, or write one page per subcommand into `output`.
pub(crate) fn handle_man(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(dir) = output else {
        let mut stdout = std::io::stdout().lock();
        write_man_page(&mut stdout)?;
        stdout.flush()?;
        return Ok(());
    };

    std::fs::create_dir_all(dir)?;
    clap_mangen::generate_to(Cli::command(), dir)?;
    eprintln!("Man pages written to {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_completions_offer_every_subcommand() {
        let mut out = Vec::new();
        write_completions(Shell::Bash, &mut out);
        let script = String::from_utf8(out).unwrap();

        assert!(script.contains("flagsync"));
        for sub in ["run", "once", "list", "completions", "man"] {
            assert!(script.contains(sub), "missing {sub}");
        }
    }

    #[test]
    fn man_page_is_titled_after_the_binary() {
        let mut out = Vec::new();
        write_man_page(&mut out).unwrap();
        let page = String::from_utf8(out).unwrap();

        assert!(page.to_lowercase().contains(".th flagsync"));
        assert!(page.contains("--store-uri"));
    }

    #[test]
    fn man_directory_gets_a_page_per_subcommand() {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("flagsync-man-{nonce}"));

        handle_man(Some(&dir)).unwrap();

        for page in ["flagsync.1", "flagsync-run.1", "flagsync-once.1", "flagsync-list.1"] {
            assert!(dir.join(page).is_file(), "missing {page}");
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
