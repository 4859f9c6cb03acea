use crate::{Api, GenerateCommand, PublishArgs};
use anyhow::{Context, bail};
use scribe_engine::config::{ConfigLoader, ScribeConfig};
use scribe_engine::publish::{
    Credentials, DiagnosticsWriter, PublishRequest, Publisher, PublisherSettings, SessionCheck,
};
use scribe_engine::resolution::IntentCatalog;
use scribe_engine::session::{FileSessionStore, SessionStore};
use scribe_gen::{
    GenerationBackend, GenerationParams, JobKind, JobPoller, JobsClient, PollObservation,
    PollPolicy, VeoClient,
};
use scribe_h::HeadlessBackend;
use std::path::Path;
use tracing::{info, warn};

/// Load the config file and apply environment overrides.
pub async fn load_config(path: Option<&Path>) -> anyhow::Result<ScribeConfig> {
    let mut config = match path {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(headless) = headless_override(std::env::var("HEADLESS").ok().as_deref()) {
        config.browser.headless = headless;
    }
    Ok(config)
}

/// `HEADLESS=false` (or `0`/`no`/`off`) forces a visible browser.
fn headless_override(value: Option<&str>) -> Option<bool> {
    let normalized = value?.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "0" | "false" | "no" | "off" => Some(false),
        "1" | "true" | "yes" | "on" => Some(true),
        _ => None,
    }
}

fn store(config: &ScribeConfig) -> FileSessionStore {
    FileSessionStore::from_config(&config.session)
}

pub async fn publish(mut config: ScribeConfig, args: PublishArgs) -> anyhow::Result<()> {
    let body = match (args.body, args.body_file) {
        (Some(body), _) => body,
        (None, Some(file)) => tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read body file {}", file.display()))?,
        (None, None) => bail!("either --body or --body-file is required"),
    };
    let mut request = PublishRequest::new(args.title, body);
    if let Some(path) = args.header_image {
        request = request.with_header_image(path);
    }
    if let Some(path) = args.body_image {
        request = request.with_body_image(path);
    }
    request.validate()?;

    if !args.post {
        println!("Dry run (pass --post to publish)");
        println!("  title: {}", request.title);
        println!("  body: {} chars", request.body.chars().count());
        if let Some(path) = &request.header_image {
            println!("  header image: {}", path.display());
        }
        if let Some(path) = &request.body_image {
            println!("  body image: {}", path.display());
        }
        return Ok(());
    }

    if args.visible {
        config.browser.headless = false;
    }
    let credentials = Credentials::from_env(&config.credentials);
    if credentials.is_none() {
        info!(
            "No credentials in {}/{}; relying on the stored session",
            config.credentials.email_env, config.credentials.password_env
        );
    }
    let store = store(&config);
    let mut backend = HeadlessBackend::new(config.browser.clone());
    let mut publisher = Publisher::new(
        &mut backend,
        &store,
        PublisherSettings::from_config(&config, credentials),
    )
    .with_catalog(IntentCatalog::with_overrides(&config.intents))
    .with_diagnostics(DiagnosticsWriter::from_config(&config.diagnostics));

    let outcome = publisher.run(&request).await;
    for warning in &outcome.warnings {
        warn!("{}", warning);
    }
    if let Some(bundle) = &outcome.diagnostics {
        for path in [&bundle.snapshot, &bundle.screenshot].into_iter().flatten() {
            eprintln!("Diagnostics written to {}", path.display());
        }
    }
    let warnings = outcome.into_result()?;
    println!("Published \"{}\" ({} warnings)", request.title, warnings.len());
    Ok(())
}

fn api_key(config: &ScribeConfig) -> Option<String> {
    std::env::var(&config.generation.api_key_env).ok()
}

fn generation_backend(
    config: &ScribeConfig,
    api: Api,
) -> anyhow::Result<Box<dyn GenerationBackend>> {
    let key = api_key(config);
    Ok(match api {
        Api::Jobs => Box::new(JobsClient::from_config(&config.generation, key)?),
        Api::Veo => Box::new(VeoClient::from_config(&config.generation, key)?),
    })
}

pub async fn generate(config: &ScribeConfig, command: GenerateCommand) -> anyhow::Result<()> {
    let (kind, api, params, post) = match command {
        GenerateCommand::Image {
            prompt,
            aspect,
            model,
            post,
        } => {
            let mut params = GenerationParams::new(prompt);
            if let Some(aspect) = aspect {
                params = params.aspect_ratio(aspect);
            }
            if let Some(model) = model {
                params = params.model(model);
            }
            (JobKind::Image, Api::Jobs, params, post)
        }
        GenerateCommand::Video {
            prompt,
            image_url,
            duration,
            model,
            api,
            post,
        } => {
            let mut params = GenerationParams::new(prompt);
            if let Some(url) = image_url {
                params = params.image_url(url);
            }
            if let Some(secs) = duration {
                params = params.duration_secs(secs);
            }
            if let Some(model) = model {
                params = params.model(model);
            }
            (JobKind::Video, api, params, post)
        }
        GenerateCommand::Extend {
            origin_task,
            prompt,
            post,
        } => (
            JobKind::Video,
            Api::Veo,
            GenerationParams::new(prompt).extending(origin_task),
            post,
        ),
    };

    let backend = generation_backend(config, api)?;
    if !post {
        let payload = backend.payload(kind, &params)?;
        println!("{}", serde_json::to_string_pretty(&payload)?);
        eprintln!("Dry run (pass --post to submit to {})", backend.name());
        return Ok(());
    }

    let policy: PollPolicy = match kind {
        JobKind::Image => config.generation.image_poll.into(),
        JobKind::Video => config.generation.video_poll.into(),
    };
    let poller = JobPoller::new(backend);
    let (job, url) = poller.run(kind, params, policy).await?;
    info!(task_id = job.task_id(), "Job finished");
    println!("{}", url);
    Ok(())
}

pub async fn status(config: &ScribeConfig, task_id: &str, api: Api) -> anyhow::Result<()> {
    let poller = JobPoller::new(generation_backend(config, api)?);
    match poller.check(task_id).await? {
        PollObservation::Running => println!("running"),
        PollObservation::Succeeded(urls) => {
            println!("success");
            for url in urls {
                println!("{}", url);
            }
        }
        PollObservation::Failed(reason) => bail!("task {} failed: {}", task_id, reason),
        PollObservation::Unclassified(detail) => bail!("unknown status: {}", detail),
    }
    Ok(())
}

pub async fn login(mut config: ScribeConfig, post: bool) -> anyhow::Result<()> {
    let store = store(&config);
    if !post {
        match store.peek().await? {
            Some(session) if !session.is_empty() => println!(
                "Stored session at {}: {} cookies captured {}",
                store.path().display(),
                session.cookies.len(),
                session.captured_at
            ),
            _ => println!("No stored session at {}", store.path().display()),
        }
        return Ok(());
    }

    // Interactive: the operator may need to solve a challenge by hand.
    config.browser.headless = false;
    let mut backend = HeadlessBackend::new(config.browser.clone());
    let mut publisher = Publisher::new(
        &mut backend,
        &store,
        PublisherSettings::from_config(&config, Credentials::from_env(&config.credentials)),
    )
    .with_catalog(IntentCatalog::with_overrides(&config.intents))
    .with_diagnostics(DiagnosticsWriter::from_config(&config.diagnostics));

    match publisher.refresh_session().await? {
        SessionCheck::Valid => println!("Stored session is valid"),
        SessionCheck::RedirectedToLogin => {
            println!("Logged in; session saved to {}", store.path().display())
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_headless_override() {
        assert_eq!(headless_override(Some("false")), Some(false));
        assert_eq!(headless_override(Some(" FALSE ")), Some(false));
        assert_eq!(headless_override(Some("1")), Some(true));
        assert_eq!(headless_override(Some("maybe")), None);
        assert_eq!(headless_override(None), None);
    }

    #[tokio::test]
    #[serial]
    async fn test_load_config_honours_headless_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scribe.yaml");
        std::fs::write(&path, "browser:\n  headless: true\n").unwrap();

        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("HEADLESS", "false") };
        let config = load_config(Some(&path)).await.unwrap();
        unsafe { std::env::remove_var("HEADLESS") };

        assert!(!config.browser.headless);
    }

    #[tokio::test]
    #[serial]
    async fn test_login_report_leaves_seed_unwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ScribeConfig::default();
        config.session.path = dir.path().join("cookies.json");
        config.session.seed_env = "SCRIBE_TEST_LOGIN_SEED".to_string();

        // SAFETY: serialized with other env-mutating tests.
        unsafe {
            std::env::set_var(
                "SCRIBE_TEST_LOGIN_SEED",
                r#"[{"name":"_note_session_v5","value":"seeded"}]"#,
            )
        };
        let result = login(config.clone(), false).await;
        unsafe { std::env::remove_var("SCRIBE_TEST_LOGIN_SEED") };

        assert!(result.is_ok());
        assert!(!config.session.path.exists());
    }

    #[tokio::test]
    async fn test_dry_run_generation_prints_payload_without_key() {
        let config = ScribeConfig::default();
        let backend = generation_backend(&config, Api::Veo).unwrap();
        let payload = backend
            .payload(
                JobKind::Video,
                &GenerationParams::new("waves").extending("veo_1"),
            )
            .unwrap();
        assert_eq!(payload["originTaskId"], "veo_1");
    }
}
