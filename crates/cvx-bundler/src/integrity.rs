use crate::build_tool::Metafile;
use crate::context::BundleContext;
use crate::errors::BundleError;
use cvx_fs::FileStat;
use std::path::PathBuf;

/// Inputs that do not correspond to files on disk.
fn is_virtual_input(path: &str) -> bool {
    path.contains("(disabled):") || path.starts_with("wasm-binary:") || path.starts_with("wasm-stub:")
}

/// Compare every consumed input with the live filesystem and, if nothing
/// moved, register each one with the change ledger.
///
/// A size mismatch or a vanished file means something wrote to the tree
/// while the build ran; that is reported as transient so the caller retries.
/// Inputs for which `exempt` returns true are registered but not compared.
pub fn check_and_register(
    ctx: &BundleContext<'_>,
    metafile: &Metafile,
    exempt: impl Fn(&str) -> bool,
) -> Result<(), BundleError> {
    let mut observed: Vec<(PathBuf, FileStat)> = Vec::with_capacity(metafile.inputs.len());

    for (rel_path, input) in &metafile.inputs {
        if is_virtual_input(rel_path) {
            continue;
        }
        let abs_path = ctx.absolute(rel_path);
        let stat = match ctx.fs.stat(&abs_path) {
            Ok(stat) => stat,
            Err(_) => {
                ctx.log.warning(&format!(
                    "Bundled file {} disappeared right after the build",
                    abs_path.display()
                ));
                return Err(BundleError::transient(format!(
                    "{} changed during bundling",
                    abs_path.display()
                )));
            }
        };
        if !exempt(rel_path) && stat.size != input.bytes {
            ctx.log.warning(&format!(
                "Bundled file {} changed right after the build",
                abs_path.display()
            ));
            return Err(BundleError::transient(format!(
                "{} changed during bundling ({} bytes read, {} bytes now)",
                abs_path.display(),
                input.bytes,
                stat.size
            )));
        }
        observed.push((abs_path, stat));
    }

    for (path, stat) in observed {
        ctx.fs.register_path(&path, Some(stat));
    }
    Ok(())
}
