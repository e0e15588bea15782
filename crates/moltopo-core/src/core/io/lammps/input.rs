use super::{DEFAULT_DISTANCE_SCALE, LammpsError, LammpsReader, PairTypeRef};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

impl LammpsReader {
    /// Reads an input script, collecting units, styles and coefficients.
    ///
    /// A `read_data` command loads the named data file immediately,
    /// resolving it against the directory of the script.
    pub fn read_input(&mut self, path: &Path) -> Result<(), LammpsError> {
        info!("Reading LAMMPS input script: {}", path.display());
        let io_error = |source: std::io::Error| LammpsError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = BufReader::new(File::open(path).map_err(io_error)?);
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(io_error)?;
            let line_num = index + 1;
            let content = line.split('#').next().unwrap_or("").trim();
            let fields: Vec<&str> = content.split_whitespace().collect();
            let Some((&command, args)) = fields.split_first() else {
                continue;
            };
            let missing = |what: &str| LammpsError::Parse {
                line: line_num,
                message: format!("'{}' needs {}", command, what),
            };

            match command {
                "units" => {
                    let units = args.first().ok_or_else(|| missing("a unit style"))?;
                    if matches!(*units, "real" | "metal") {
                        self.distance_scale_factor = DEFAULT_DISTANCE_SCALE;
                    }
                    self.units = Some(units.to_string());
                }
                "read_data" => {
                    let file = args.first().ok_or_else(|| missing("a file name"))?;
                    self.read_data(&base_dir.join(file))?;
                }
                "pair_coeff" => {
                    if args.len() < 2 {
                        return Err(missing("two atom types"));
                    }
                    let parse = |token: &str| {
                        PairTypeRef::parse(token).ok_or_else(|| LammpsError::Parse {
                            line: line_num,
                            message: format!("invalid pair type '{}'", token),
                        })
                    };
                    let (a, b) = (parse(args[0])?, parse(args[1])?);
                    let key = if a <= b { (a, b) } else { (b, a) };
                    let values = args[2..].iter().map(|v| v.to_string()).collect();
                    self.force_field.pair_coeffs.insert(key, values);
                }
                _ if command.ends_with("_style") => {
                    let values = args.iter().map(|v| v.to_string()).collect();
                    self.force_field.styles.insert(command.to_string(), values);
                }
                _ if command.ends_with("_coeff") => {
                    let (target, values) = args
                        .split_first()
                        .ok_or_else(|| missing("a type"))?;
                    let family = command.trim_end_matches("_coeff").to_string();
                    self.force_field
                        .coeffs
                        .entry(family)
                        .or_default()
                        .insert(
                            target.to_string(),
                            values.iter().map(|v| v.to_string()).collect(),
                        );
                }
                _ => debug!("Ignoring command '{}' on line {}", command, line_num),
            }
        }
        Ok(())
    }
}
