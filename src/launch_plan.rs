use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::app_constants::{APP_DIR_ENV, BACKEND_CMD_ENV, BACKEND_CWD_ENV, EMBEDDED_MARKER_ENV};

/// Shape of `backend/runtime-manifest.json` inside the packaged resources.
/// Paths are relative to the manifest's directory.
#[derive(Debug, Deserialize)]
pub struct RuntimeManifest {
    pub rscript: Option<String>,
    pub app_dir: Option<String>,
    pub python: Option<String>,
}

/// Everything needed to start the backend: the command line, the working
/// directory, and the runtime paths the spawn environment is built from.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Bundled R installation root, exported as `RHOME`/`R_HOME_DIR`.
    pub r_home: Option<PathBuf>,
    /// Bundled package library, exported through the `R_LIBS*` family.
    pub library_dir: Option<PathBuf>,
    /// Bundled python for reticulate interop, when the app ships one.
    pub python_path: Option<PathBuf>,
}

/// Resolves how to start the backend, in precedence order: an explicit
/// command override, the packaged runtime manifest, then a development
/// source-tree fallback.
pub fn resolve_launch_plan(resource_dir: Option<&Path>) -> Result<LaunchPlan, String> {
    if let Some(custom_cmd) = env::var(BACKEND_CMD_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        let cwd = env::var(BACKEND_CWD_ENV)
            .map(PathBuf::from)
            .or_else(|_| env::current_dir())
            .map_err(|error| format!("Failed to resolve backend working directory: {error}"))?;
        return custom_launch_from(&custom_cmd, cwd);
    }

    if let Some(resource_dir) = resource_dir {
        if let Some(plan) = packaged_launch_from(resource_dir)? {
            return Ok(plan);
        }
    }

    dev_launch()
}

pub(crate) fn custom_launch_from(custom_cmd: &str, cwd: PathBuf) -> Result<LaunchPlan, String> {
    let mut pieces = shlex::split(custom_cmd)
        .ok_or_else(|| format!("Invalid {BACKEND_CMD_ENV}: {custom_cmd}"))?;
    if pieces.is_empty() {
        return Err(format!("{BACKEND_CMD_ENV} is empty."));
    }

    let cmd = pieces.remove(0);
    Ok(LaunchPlan {
        cmd,
        args: pieces,
        cwd,
        r_home: None,
        library_dir: None,
        python_path: None,
    })
}

pub(crate) fn packaged_launch_from(resource_dir: &Path) -> Result<Option<LaunchPlan>, String> {
    let manifest_path = resource_dir.join("backend").join("runtime-manifest.json");
    if !manifest_path.is_file() {
        return Ok(None);
    }
    let backend_dir = manifest_path
        .parent()
        .ok_or_else(|| format!("Invalid backend manifest path: {}", manifest_path.display()))?;

    let manifest_text = fs::read_to_string(&manifest_path).map_err(|error| {
        format!(
            "Failed to read packaged backend manifest {}: {}",
            manifest_path.display(),
            error
        )
    })?;
    let manifest: RuntimeManifest = serde_json::from_str(&manifest_text).map_err(|error| {
        format!(
            "Failed to parse packaged backend manifest {}: {}",
            manifest_path.display(),
            error
        )
    })?;

    let default_rscript = if cfg!(target_os = "windows") {
        PathBuf::from("r_lang").join("bin").join("Rscript.exe")
    } else {
        PathBuf::from("r_lang").join("bin").join("Rscript")
    };
    let rscript_path = backend_dir.join(
        manifest
            .rscript
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or(default_rscript),
    );
    if !rscript_path.is_file() {
        return Err(format!(
            "Packaged R runtime executable is missing: {}",
            rscript_path.display()
        ));
    }

    let app_dir = backend_dir.join(manifest.app_dir.as_deref().unwrap_or("app"));
    if !app_dir.is_dir() {
        return Err(format!(
            "Packaged Shiny app directory is missing: {}",
            app_dir.display()
        ));
    }

    // The R installation root sits one level above bin/Rscript.
    let r_home = rscript_path
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf);
    let python_path = manifest.python.as_deref().map(|p| backend_dir.join(p));

    Ok(Some(LaunchPlan {
        cmd: rscript_path.to_string_lossy().to_string(),
        args: run_app_args(&app_dir),
        cwd: backend_dir.to_path_buf(),
        library_dir: r_home.as_ref().map(|home| home.join("library")),
        r_home,
        python_path,
    }))
}

fn dev_launch() -> Result<LaunchPlan, String> {
    let app_dir = detect_dev_app_dir().ok_or_else(|| {
        format!("Cannot locate a Shiny app directory. Set {APP_DIR_ENV} to a directory containing app.R.")
    })?;

    Ok(LaunchPlan {
        cmd: "Rscript".to_string(),
        args: run_app_args(&app_dir),
        cwd: app_dir,
        r_home: None,
        library_dir: None,
        python_path: None,
    })
}

fn detect_dev_app_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var(APP_DIR_ENV) {
        let candidate = PathBuf::from(dir.trim());
        if candidate.join("app.R").is_file() {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }

    let cwd = env::current_dir().ok()?;
    for candidate in [cwd.join("app"), cwd] {
        if candidate.join("app.R").is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Arguments handing the app directory to `shiny::runApp`. R string literals
/// take forward slashes on every platform.
pub(crate) fn run_app_args(app_dir: &Path) -> Vec<String> {
    let app_path = app_dir.to_string_lossy().replace('\\', "/");
    vec![
        "-e".to_string(),
        format!("shiny::runApp('{app_path}', launch.browser = FALSE)"),
    ]
}

/// Environment table injected into the spawned backend: the embedding
/// marker, the bundled R home and library paths, and the reticulate python
/// path when one is packaged.
pub fn spawn_environment(plan: &LaunchPlan) -> Vec<(String, String)> {
    let mut table = vec![(EMBEDDED_MARKER_ENV.to_string(), "1".to_string())];

    if let Some(r_home) = &plan.r_home {
        let r_home = r_home.to_string_lossy().to_string();
        table.push(("RHOME".to_string(), r_home.clone()));
        table.push(("R_HOME_DIR".to_string(), r_home));
    }

    if let Some(library_dir) = &plan.library_dir {
        let library = library_dir.to_string_lossy().to_string();
        for key in ["R_LIBS", "R_LIBS_USER", "R_LIBS_SITE", "R_LIB_PATHS"] {
            table.push((key.to_string(), library.clone()));
        }
    }

    if let Some(python) = &plan.python_path {
        table.push((
            "RETICULATE_PYTHON".to_string(),
            python.to_string_lossy().to_string(),
        ));
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn custom_launch_splits_the_command_line() {
        let plan =
            custom_launch_from("Rscript -e 'shiny::runApp()'", PathBuf::from("/work")).unwrap();
        assert_eq!(plan.cmd, "Rscript");
        assert_eq!(plan.args, vec!["-e", "shiny::runApp()"]);
        assert_eq!(plan.cwd, PathBuf::from("/work"));
    }

    #[test]
    fn custom_launch_rejects_an_empty_command() {
        let error = custom_launch_from("", PathBuf::from("/work"))
            .map(|_| ())
            .unwrap_err();
        assert!(error.contains(BACKEND_CMD_ENV), "unexpected error: {error}");
    }

    #[test]
    fn custom_launch_rejects_unbalanced_quoting() {
        let error = custom_launch_from("Rscript -e 'unterminated", PathBuf::from("/work"))
            .map(|_| ())
            .unwrap_err();
        assert!(error.starts_with("Invalid"), "unexpected error: {error}");
    }

    #[test]
    fn packaged_launch_reads_the_manifest() {
        let resources = tempfile::tempdir().unwrap();
        let backend = resources.path().join("backend");
        touch(&backend.join("runtime").join("bin").join("Rscript"));
        fs::create_dir_all(backend.join("shiny-app")).unwrap();
        fs::write(
            backend.join("runtime-manifest.json"),
            r#"{"rscript": "runtime/bin/Rscript", "app_dir": "shiny-app", "python": "python/bin/python3"}"#,
        )
        .unwrap();

        let plan = packaged_launch_from(resources.path()).unwrap().unwrap();
        assert!(plan.cmd.ends_with("Rscript"));
        assert_eq!(plan.cwd, backend);
        assert_eq!(plan.r_home, Some(backend.join("runtime")));
        assert_eq!(plan.library_dir, Some(backend.join("runtime").join("library")));
        assert_eq!(
            plan.python_path,
            Some(backend.join("python").join("bin").join("python3"))
        );
        assert_eq!(plan.args[0], "-e");
        assert!(plan.args[1].starts_with("shiny::runApp('"));
        assert!(plan.args[1].contains("shiny-app"));
    }

    #[test]
    fn packaged_launch_is_skipped_without_a_manifest() {
        let resources = tempfile::tempdir().unwrap();
        assert!(packaged_launch_from(resources.path()).unwrap().is_none());
    }

    #[test]
    fn packaged_launch_fails_when_the_runtime_is_missing() {
        let resources = tempfile::tempdir().unwrap();
        let backend = resources.path().join("backend");
        fs::create_dir_all(&backend).unwrap();
        fs::write(backend.join("runtime-manifest.json"), r#"{}"#).unwrap();

        let error = packaged_launch_from(resources.path())
            .map(|_| ())
            .unwrap_err();
        assert!(error.contains("missing"), "unexpected error: {error}");
    }

    #[test]
    fn run_app_args_normalize_path_separators() {
        let args = run_app_args(Path::new(r"C:\desk\app"));
        assert_eq!(args[1], "shiny::runApp('C:/desk/app', launch.browser = FALSE)");
    }

    #[test]
    fn spawn_environment_exports_the_runtime_paths() {
        let plan = LaunchPlan {
            cmd: "Rscript".to_string(),
            args: Vec::new(),
            cwd: PathBuf::from("/bundle/backend"),
            r_home: Some(PathBuf::from("/bundle/backend/r_lang")),
            library_dir: Some(PathBuf::from("/bundle/backend/r_lang/library")),
            python_path: Some(PathBuf::from("/bundle/backend/python/bin/python3")),
        };

        let table = spawn_environment(&plan);
        let get = |key: &str| {
            table
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get(EMBEDDED_MARKER_ENV), Some("1"));
        assert_eq!(get("RHOME"), Some("/bundle/backend/r_lang"));
        assert_eq!(get("R_HOME_DIR"), Some("/bundle/backend/r_lang"));
        for key in ["R_LIBS", "R_LIBS_USER", "R_LIBS_SITE", "R_LIB_PATHS"] {
            assert_eq!(get(key), Some("/bundle/backend/r_lang/library"));
        }
        assert_eq!(
            get("RETICULATE_PYTHON"),
            Some("/bundle/backend/python/bin/python3")
        );
    }

    #[test]
    fn spawn_environment_only_marks_embedding_for_bare_plans() {
        let plan = LaunchPlan {
            cmd: "Rscript".to_string(),
            args: Vec::new(),
            cwd: PathBuf::from("."),
            r_home: None,
            library_dir: None,
            python_path: None,
        };
        let table = spawn_environment(&plan);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].0, EMBEDDED_MARKER_ENV);
    }
}
