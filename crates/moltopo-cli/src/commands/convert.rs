use crate::cli::ConvertArgs;
use crate::error::{CliError, Result};
use moltopo::core::settings::Settings;
use moltopo::workflows::load::{self, CoordinateFormat};
use tracing::info;

pub fn run(args: ConvertArgs, settings: &Settings) -> Result<()> {
    if CoordinateFormat::from_path(&args.output).is_none() {
        return Err(CliError::Argument(format!(
            "cannot infer an output format from '{}' (expected .gro or .pdb)",
            args.output.display()
        )));
    }

    let mut set = load::read_coordinates(&args.input, settings)?;
    if args.renumber {
        let changed = set
            .renumber()
            .iter()
            .filter(|(old, new)| old != new)
            .count();
        info!("Renumbered {} atoms", changed);
    }
    load::write_coordinates(&set, &args.output, settings)?;

    println!(
        "Converted {} atoms from {} to {}",
        set.len(),
        args.input.display(),
        args.output.display()
    );
    Ok(())
}
