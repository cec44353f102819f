use std::sync::{Arc, Mutex, MutexGuard};
use tauri::{Manager, State};
use ytmad_engine::config::load_download_settings;
use ytmad_engine::paths::AppPaths;
use ytmad_engine::shell::{Shell, ShellTick, ShellView};
use ytmad_engine::ytdlp::{MediaDownloader, YtDlp};

struct AppState {
    paths: AppPaths,
    shell: Mutex<Shell>,
}

fn lock_shell<'a>(state: &'a State<'_, AppState>) -> Result<MutexGuard<'a, Shell>, String> {
    state
        .shell
        .lock()
        .map_err(|_| "shell state is poisoned".to_string())
}

#[tauri::command]
fn shell_view(state: State<'_, AppState>) -> Result<ShellView, String> {
    Ok(lock_shell(&state)?.view())
}

#[tauri::command]
fn shell_set_folder(state: State<'_, AppState>, folder: String) -> Result<ShellView, String> {
    let folder = folder.trim().to_string();
    if folder.is_empty() {
        state
            .paths
            .clear_output_dir_override()
            .map_err(|e| e.to_string())?;
    } else {
        state
            .paths
            .set_output_dir_override(std::path::Path::new(&folder))
            .map_err(|e| e.to_string())?;
    }
    let mut shell = lock_shell(&state)?;
    shell.set_folder(folder);
    Ok(shell.view())
}

#[tauri::command]
fn shell_set_urls(state: State<'_, AppState>, text: String) -> Result<(), String> {
    lock_shell(&state)?.set_urls_text(text);
    Ok(())
}

#[tauri::command]
fn shell_clear_urls(state: State<'_, AppState>) -> Result<ShellView, String> {
    let mut shell = lock_shell(&state)?;
    shell.clear_urls();
    Ok(shell.view())
}

#[tauri::command]
fn shell_start(state: State<'_, AppState>, urls_text: Option<String>) -> Result<ShellView, String> {
    let mut shell = lock_shell(&state)?;
    if let Some(text) = urls_text {
        shell.set_urls_text(text);
    }
    shell.start().map_err(|e| e.to_string())?;
    Ok(shell.view())
}

#[tauri::command]
fn shell_poll(state: State<'_, AppState>) -> Result<ShellTick, String> {
    Ok(lock_shell(&state)?.poll())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let paths = AppPaths::new(app.path().app_data_dir()?);
            paths.ensure_dirs()?;
            let settings = load_download_settings(&paths)?;
            let downloader: Arc<dyn MediaDownloader> =
                Arc::new(YtDlp::discover(Some(&paths), &settings));
            let mut shell = Shell::new(downloader, settings);
            if let Some(folder) = paths.output_dir_override()? {
                shell.set_folder(folder.to_string_lossy());
            }
            app.manage(AppState {
                paths,
                shell: Mutex::new(shell),
            });
            Ok(())
        })
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            shell_clear_urls,
            shell_poll,
            shell_set_folder,
            shell_set_urls,
            shell_start,
            shell_view
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
