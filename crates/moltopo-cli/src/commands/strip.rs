use crate::cli::StripArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::parse_id_list;
use moltopo::core::io::top::TopFile;
use moltopo::core::io::traits::MolecularFile;
use moltopo::core::models::atom::AtomId;
use moltopo::core::settings::Settings;
use moltopo::workflows::load::{self, CoordinateFormat, TopologyFormat};
use std::collections::HashSet;
use tracing::info;

pub fn run(args: StripArgs, settings: &Settings) -> Result<()> {
    let ids: HashSet<AtomId> = parse_id_list(&args.ids)
        .map_err(|e| CliError::Argument(e.to_string()))?
        .into_iter()
        .collect();
    let renumber = !args.keep_ids;

    let (removed, remaining) = if CoordinateFormat::from_path(&args.input).is_some() {
        let mut set = load::read_coordinates(&args.input, settings)?;
        let removed = set.remove_atoms(&ids, renumber)?.len();
        load::write_coordinates(&set, &args.output, settings)?;
        (removed, set.len())
    } else if TopologyFormat::from_path(&args.input) == Some(TopologyFormat::Gromacs) {
        let options = settings.top_options();
        let mut top = TopFile::read_from_path(&args.input, &options)?;
        let removed = top.topology.remove_atoms(&ids, renumber)?.len();
        TopFile::write_to_path(&top, &options, &args.output)?;
        (removed, top.topology.len())
    } else {
        return Err(CliError::Argument(format!(
            "'{}' is neither a coordinate file nor a .top file",
            args.input.display()
        )));
    };

    info!("Removed {} atoms, {} remain", removed, remaining);
    println!(
        "Removed {} atoms; wrote {} atoms to {}",
        removed,
        remaining,
        args.output.display()
    );
    Ok(())
}
