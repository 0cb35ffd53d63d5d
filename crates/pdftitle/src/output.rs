use colored::Colorize;

use crate::prelude::{eprintln, println, *};
use crate::process::Outcome;

/// Print the result for one document.
///
/// Plain output is the title alone (or `path => target` when renaming);
/// `--json` prints one object per line.
pub fn print_outcome(outcome: &Outcome, json: bool, verbose: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }

    match &outcome.renamed_to {
        Some(target) => println!("{} => {}", outcome.path.display(), target.display()),
        None => println!("{}", outcome.title),
    }

    if verbose {
        eprintln!(
            "{}",
            f!("  {:?} from {}", outcome.source, outcome.path.display()).dimmed()
        );
    }

    Ok(())
}

/// Print a summary table of every processed document.
pub fn print_table(outcomes: &[Outcome]) {
    let mut table = new_table();
    table.add_row(prettytable::row!["Path", "Title", "Source"]);
    for outcome in outcomes {
        let source = if outcome.failed {
            "failed".to_string()
        } else {
            f!("{:?}", outcome.source)
        };
        table.add_row(prettytable::row![
            outcome.path.display(),
            outcome.title,
            source
        ]);
    }
    table.printstd();
}
