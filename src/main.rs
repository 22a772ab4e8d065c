// Prevents additional console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager, State};
use tokio::sync::Mutex;

use voxsecure_lib::audio::{self, cpal_input, DeviceArbiter};
use voxsecure_lib::auth::{AuthResponse, AuthService};
use voxsecure_lib::command::recognizer::{NoRecognizer, SpeechRecognizer};
use voxsecure_lib::command::{
    CommandCenter, CommandOutcome, CommandStatus, CommandTable, ContactDraft, ContactField,
    Dictation, Navigator, RemoteTranscriber, Target,
};
use voxsecure_lib::enrollment::{EnrollmentCoordinator, EnrollmentStatus};
use voxsecure_lib::login::{LoginCoordinator, LoginStatus};
use voxsecure_lib::validation::FormField;
use voxsecure_lib::{
    friendly_error, AppConfig, AppPaths, Error, FriendlyError, HttpAuthClient, PassphraseCatalog,
    SessionStore,
};

/// Application state
struct AppState {
    catalog: Arc<PassphraseCatalog>,
    enrollment: Mutex<EnrollmentCoordinator>,
    login: Mutex<LoginCoordinator>,
    commands: Arc<CommandCenter>,
    dictation: Dictation,
    contact: Mutex<ContactDraft>,
}

type CommandResult<T> = Result<T, FriendlyError>;

fn friendly(e: Error) -> FriendlyError {
    log::warn!("Command failed: {}", e);
    friendly_error(&e)
}

/// Forwards matched voice commands to the webview
struct TauriNavigator {
    app: AppHandle,
}

impl Navigator for TauriNavigator {
    fn navigate(&self, target: Target) {
        if let Err(e) = self.app.emit("command:navigate", target.as_str()) {
            log::error!("Failed to emit navigation to {}: {}", target, e);
        }
    }
}

fn build_state(app: AppHandle, paths: &AppPaths, config: &AppConfig) -> voxsecure_lib::Result<AppState> {
    let catalog = Arc::new(config.catalog());
    let arbiter = DeviceArbiter::new();
    let device = audio::default_input_device(config.capture.device_name.clone());
    let auth: Arc<dyn AuthService> = Arc::new(HttpAuthClient::new(&config.auth)?);
    let session = SessionStore::open(&paths.session_file());

    let locale = if catalog.contains(&config.default_locale) {
        config.default_locale.clone()
    } else {
        let fallback = catalog.locales().first().map(|l| l.to_string()).unwrap_or_default();
        log::warn!(
            "Default locale '{}' not in catalog, using '{}'",
            config.default_locale,
            fallback
        );
        fallback
    };

    let enrollment = EnrollmentCoordinator::new(
        Arc::clone(&catalog),
        Arc::clone(&device),
        arbiter.clone(),
        Arc::clone(&auth),
        &locale,
    )?;
    let login = LoginCoordinator::new(
        Arc::clone(&catalog),
        Arc::clone(&device),
        arbiter.clone(),
        auth,
        session.clone(),
        &locale,
    )?;

    let recognizer: Arc<dyn SpeechRecognizer> =
        match RemoteTranscriber::new(&config.recognizer, device) {
            Ok(transcriber) => Arc::new(transcriber),
            Err(e) => {
                log::error!("Speech recognition unavailable: {}", e);
                Arc::new(NoRecognizer)
            }
        };
    let commands = Arc::new(CommandCenter::new(
        recognizer,
        CommandTable::default(),
        Arc::new(TauriNavigator { app }),
        session,
        arbiter,
    ));

    Ok(AppState {
        catalog,
        enrollment: Mutex::new(enrollment),
        login: Mutex::new(login),
        dictation: Dictation::new(Arc::clone(&commands)),
        commands,
        contact: Mutex::new(ContactDraft::default()),
    })
}

/// Tauri command: List passphrase locales
#[tauri::command]
async fn list_locales(state: State<'_, AppState>) -> Result<Vec<String>, String> {
    Ok(state.catalog.locales().iter().map(|l| l.to_string()).collect())
}

/// Tauri command: List available input devices
#[tauri::command]
async fn list_input_devices() -> Result<Vec<cpal_input::DeviceInfo>, String> {
    cpal_input::list_input_devices().map_err(|e| e.to_string())
}

// ===== ENROLLMENT COMMANDS =====

#[tauri::command]
async fn enroll_update_field(
    field: String,
    value: String,
    state: State<'_, AppState>,
) -> CommandResult<EnrollmentStatus> {
    let field: FormField = field.parse().map_err(|_| {
        friendly(Error::InvalidForm {
            fields: vec![field.clone()],
        })
    })?;
    let mut enrollment = state.enrollment.lock().await;
    enrollment.update_field(field, &value);
    Ok(enrollment.status())
}

#[tauri::command]
async fn enroll_set_locale(
    locale: String,
    state: State<'_, AppState>,
) -> CommandResult<EnrollmentStatus> {
    let mut enrollment = state.enrollment.lock().await;
    enrollment.set_locale(&locale).map_err(friendly)?;
    Ok(enrollment.status())
}

/// Tauri command: Start recording the next enrollment passphrase
#[tauri::command]
async fn enroll_begin_capture(state: State<'_, AppState>) -> CommandResult<String> {
    let mut enrollment = state.enrollment.lock().await;
    enrollment.begin_capture().await.map_err(friendly)
}

/// Tauri command: Stop recording; emits `enroll:ready` after the third sample
#[tauri::command]
async fn enroll_end_capture(
    app_handle: AppHandle,
    state: State<'_, AppState>,
) -> CommandResult<EnrollmentStatus> {
    let mut enrollment = state.enrollment.lock().await;
    enrollment.end_capture().await.map_err(friendly)?;

    let status = enrollment.status();
    if status.ready_to_submit {
        let _ = app_handle.emit("enroll:ready", &status);
    }
    Ok(status)
}

#[tauri::command]
async fn enroll_submit(state: State<'_, AppState>) -> CommandResult<AuthResponse> {
    let mut enrollment = state.enrollment.lock().await;
    enrollment.submit().await.map_err(friendly)
}

#[tauri::command]
async fn enroll_abandon(state: State<'_, AppState>) -> CommandResult<EnrollmentStatus> {
    let mut enrollment = state.enrollment.lock().await;
    enrollment.abandon();
    Ok(enrollment.status())
}

#[tauri::command]
async fn enroll_status(state: State<'_, AppState>) -> CommandResult<EnrollmentStatus> {
    Ok(state.enrollment.lock().await.status())
}

// ===== LOGIN COMMANDS =====

/// Tauri command: Select login locale; returns the freshly drawn passphrase
#[tauri::command]
async fn login_set_locale(locale: String, state: State<'_, AppState>) -> CommandResult<String> {
    let mut login = state.login.lock().await;
    login.set_locale(&locale).map(str::to_string).map_err(friendly)
}

#[tauri::command]
async fn login_begin_capture(state: State<'_, AppState>) -> CommandResult<LoginStatus> {
    let mut login = state.login.lock().await;
    login.begin_capture().await.map_err(friendly)?;
    Ok(login.status())
}

#[tauri::command]
async fn login_end_capture(state: State<'_, AppState>) -> CommandResult<LoginStatus> {
    let mut login = state.login.lock().await;
    login.end_capture().await.map_err(friendly)?;
    Ok(login.status())
}

/// Tauri command: Submit the login attempt; emits `login:result`
#[tauri::command]
async fn login_submit(
    identifier: String,
    app_handle: AppHandle,
    state: State<'_, AppState>,
) -> CommandResult<AuthResponse> {
    let mut login = state.login.lock().await;
    let response = login.submit(&identifier).await.map_err(friendly)?;
    let _ = app_handle.emit("login:result", &response);
    Ok(response)
}

#[tauri::command]
async fn login_status(state: State<'_, AppState>) -> CommandResult<LoginStatus> {
    Ok(state.login.lock().await.status())
}

// ===== VOICE COMMANDS =====

/// Tauri command: Listen for one voice command and dispatch it
#[tauri::command]
async fn command_listen(state: State<'_, AppState>) -> CommandResult<CommandOutcome> {
    state.commands.listen().await.map_err(friendly)
}

#[tauri::command]
async fn command_status(state: State<'_, AppState>) -> CommandResult<CommandStatus> {
    Ok(state.commands.status())
}

/// Tauri command: Dictate one contact form field
#[tauri::command]
async fn dictate_contact_field(
    field: String,
    state: State<'_, AppState>,
) -> CommandResult<ContactDraft> {
    let field: ContactField = field.parse().map_err(|_| {
        friendly(Error::InvalidForm {
            fields: vec![field.clone()],
        })
    })?;
    let mut draft = state.contact.lock().await;
    state
        .dictation
        .dictate(&mut draft, field)
        .await
        .map_err(friendly)?;
    Ok(draft.clone())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("VoxSecure starting...");

    if let Err(e) = run_app().await {
        log::error!("Application failed to start: {:#}", e);
        std::process::exit(1);
    }
}

/// Run the Tauri application
async fn run_app() -> anyhow::Result<()> {
    let paths = AppPaths::new()?;
    paths.ensure_directories()?;

    let config = AppConfig::load_or_create(&paths.config_file())?;
    log::info!("Configuration loaded");

    tauri::Builder::default()
        .setup(move |app| {
            let state = build_state(app.handle().clone(), &paths, &config)?;
            app.manage(state);
            log::info!("Voice interaction core ready");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            list_locales,
            list_input_devices,
            enroll_update_field,
            enroll_set_locale,
            enroll_begin_capture,
            enroll_end_capture,
            enroll_submit,
            enroll_abandon,
            enroll_status,
            login_set_locale,
            login_begin_capture,
            login_end_capture,
            login_submit,
            login_status,
            command_listen,
            command_status,
            dictate_contact_field
        ])
        .run(tauri::generate_context!())?;

    Ok(())
}
