//! `init` route: scaffold a new `crucible.json` manifest in the current
//! directory (spec §6's manifest schema).

use anyhow::{bail, Result};
use serde_json::json;

use crate::core::command_line::CommandLineInputs;
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

pub fn init(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<()> {
    let root = inputs.working_directory.clone();
    let manifest_path = root.join("crucible.json");

    if manifest_path.exists() {
        bail!("`{}` already exists", manifest_path.display());
    }

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "workspace".to_string());

    let manifest = json!({
        "workspace": name,
        "version": "0.1.0",
        "targets": {
            "app": {
                "kind": "executable",
                "language": "cpp",
                "cppStandard": "17",
                "files": ["src/main.cpp"],
            }
        }
    });

    let src_dir = root.join("src");
    std::fs::create_dir_all(&src_dir)?;
    let main_cpp = src_dir.join("main.cpp");
    if !main_cpp.exists() {
        std::fs::write(&main_cpp, "#include <iostream>\n\nint main() {\n    std::cout << \"hello, world\\n\";\n    return 0;\n}\n")?;
    }

    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    shell.status(Status::Created, manifest_path.display().to_string());

    let _ = ctx;
    Ok(())
}
