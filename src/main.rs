use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use davlink::{
    config::Config,
    services::webdav::{
        AuthType, ByteRange, CopyFileOptions, CreateDirectoryOptions, DirectoryContentsOptions,
        DownloadDirectoryOptions, FileContents, FileContentsOptions, LockOptions, MoveFileOptions,
        OutputFormat, PutFileContentsOptions, QuotaOptions, RequestOptions, StatOptions,
        WebDAVService,
    },
};

fn cli() -> Command {
    let path_arg = || Arg::new("path").help("Remote path").required(true).index(1);

    Command::new("davlink")
        .about("WebDAV client")
        .subcommand_required(true)
        .arg(Arg::new("url").long("url").global(true).help("Server URL, overrides DAV_URL"))
        .arg(Arg::new("username").long("username").short('u').global(true))
        .arg(Arg::new("password").long("password").short('p').global(true))
        .arg(
            Arg::new("auth")
                .long("auth")
                .global(true)
                .help("auto, digest, none, password or token"),
        )
        .subcommand(
            Command::new("stat")
                .about("Show metadata of a resource")
                .arg(path_arg())
                .arg(Arg::new("details").long("details").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("ls")
                .about("List a collection")
                .arg(Arg::new("path").index(1).default_value("/"))
                .arg(Arg::new("deep").long("deep").action(ArgAction::SetTrue))
                .arg(Arg::new("self").long("self").action(ArgAction::SetTrue))
                .arg(Arg::new("details").long("details").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("get")
                .about("Download a file")
                .arg(path_arg())
                .arg(Arg::new("output").long("output").short('o').value_name("FILE"))
                .arg(Arg::new("range").long("range").value_name("START-END"))
                .arg(Arg::new("text").long("text").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("put")
                .about("Upload a local file")
                .arg(Arg::new("local").required(true).index(1))
                .arg(Arg::new("path").required(true).index(2))
                .arg(Arg::new("no-overwrite").long("no-overwrite").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("push")
                .about("Upload a local directory tree")
                .arg(Arg::new("local").required(true).index(1))
                .arg(Arg::new("path").required(true).index(2)),
        )
        .subcommand(
            Command::new("pull")
                .about("Download every file of a collection")
                .arg(path_arg())
                .arg(Arg::new("dest").required(true).index(2))
                .arg(Arg::new("deep").long("deep").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("mkdir")
                .about("Create a collection")
                .arg(path_arg())
                .arg(Arg::new("recursive").long("recursive").short('r').action(ArgAction::SetTrue)),
        )
        .subcommand(Command::new("rm").about("Delete a resource").arg(path_arg()))
        .subcommand(
            Command::new("cp")
                .about("Copy a resource")
                .arg(Arg::new("from").required(true).index(1))
                .arg(Arg::new("to").required(true).index(2))
                .arg(Arg::new("no-overwrite").long("no-overwrite").action(ArgAction::SetTrue))
                .arg(Arg::new("shallow").long("shallow").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("mv")
                .about("Move a resource")
                .arg(Arg::new("from").required(true).index(1))
                .arg(Arg::new("to").required(true).index(2))
                .arg(Arg::new("no-overwrite").long("no-overwrite").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("quota")
                .about("Show used and available space")
                .arg(Arg::new("path").index(1)),
        )
        .subcommand(
            Command::new("caps")
                .about("Show DAV compliance of a path")
                .arg(Arg::new("path").index(1).default_value("/")),
        )
        .subcommand(
            Command::new("lock")
                .about("Take or refresh an exclusive write lock")
                .arg(path_arg())
                .arg(Arg::new("timeout").long("timeout"))
                .arg(Arg::new("refresh").long("refresh").value_name("TOKEN")),
        )
        .subcommand(
            Command::new("unlock")
                .about("Release a lock")
                .arg(path_arg())
                .arg(Arg::new("token").required(true).index(2)),
        )
        .subcommand(
            Command::new("link")
                .about("Print a download or upload link with embedded credentials")
                .arg(path_arg())
                .arg(Arg::new("upload").long("upload").action(ArgAction::SetTrue)),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info")
                .add_directive("davlink=info".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
        });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let service = build_service(&matches)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight requests");
            ctrl_c.cancel();
        }
    });
    let request = RequestOptions::with_cancel(cancel);

    if let Err(e) = run(&service, &matches, request).await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn build_service(matches: &ArgMatches) -> Result<WebDAVService> {
    let env_config = Config::from_env()?;
    let mut config = env_config.webdav_config();

    if let Some(url) = matches.get_one::<String>("url") {
        config.server_url = url.clone();
    }
    if let Some(username) = matches.get_one::<String>("username") {
        config.username = Some(username.clone());
    }
    if let Some(password) = matches.get_one::<String>("password") {
        config.password = Some(password.clone());
    }
    if let Some(auth) = matches.get_one::<String>("auth") {
        config.auth_type = Some(auth.parse::<AuthType>()?);
    }

    WebDAVService::new_with_configs(config, env_config.concurrency_config())
        .context("Failed to create WebDAV client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches.get_one::<String>(name).map(String::as_str).unwrap_or("/")
}

async fn run(service: &WebDAVService, matches: &ArgMatches, request: RequestOptions) -> Result<()> {
    match matches.subcommand() {
        Some(("stat", m)) => {
            let options = StatOptions {
                details: m.get_flag("details"),
                request,
            };
            print_json(&service.stat(arg(m, "path"), &options).await?)
        }
        Some(("ls", m)) => {
            let options = DirectoryContentsOptions {
                deep: m.get_flag("deep"),
                details: m.get_flag("details"),
                include_self: m.get_flag("self"),
                request,
            };
            print_json(&service.get_directory_contents(arg(m, "path"), &options).await?)
        }
        Some(("get", m)) => {
            let range = m
                .get_one::<String>("range")
                .map(|r| r.parse::<ByteRange>())
                .transpose()?;
            let format = if m.get_flag("text") { OutputFormat::Text } else { OutputFormat::Binary };
            let options = FileContentsOptions { format, range, request };
            let contents = service.get_file_contents(arg(m, "path"), &options).await?;

            match (m.get_one::<String>("output"), contents) {
                (Some(output), contents) => {
                    tokio::fs::write(output, contents.into_bytes()).await?;
                    info!("✅ Saved to {}", output);
                }
                (None, FileContents::Text(text)) => print!("{}", text),
                (None, FileContents::Binary(bytes)) => {
                    use std::io::Write;
                    std::io::stdout().write_all(&bytes)?;
                }
            }
            Ok(())
        }
        Some(("put", m)) => {
            let local = PathBuf::from(arg(m, "local"));
            let options = PutFileContentsOptions {
                overwrite: !m.get_flag("no-overwrite"),
                request: with_content_type(request, &local),
                ..Default::default()
            };
            let data = tokio::fs::read(&local)
                .await
                .with_context(|| format!("Failed to read {}", local.display()))?;
            let written = service.put_file_contents(arg(m, "path"), data, &options).await?;
            if !written {
                bail!("{} already exists", arg(m, "path"));
            }
            info!("✅ Uploaded {}", local.display());
            Ok(())
        }
        Some(("push", m)) => push_tree(service, Path::new(arg(m, "local")), arg(m, "path"), request).await,
        Some(("pull", m)) => {
            let options = DownloadDirectoryOptions {
                deep: m.get_flag("deep"),
                request,
            };
            pull_tree(service, arg(m, "path"), Path::new(arg(m, "dest")), &options).await
        }
        Some(("mkdir", m)) => {
            let options = CreateDirectoryOptions {
                recursive: m.get_flag("recursive"),
                request,
            };
            service.create_directory(arg(m, "path"), &options).await?;
            Ok(())
        }
        Some(("rm", m)) => Ok(service.delete_file(arg(m, "path"), &request).await?),
        Some(("cp", m)) => {
            let options = CopyFileOptions {
                overwrite: !m.get_flag("no-overwrite"),
                shallow: m.get_flag("shallow"),
                request,
            };
            Ok(service.copy_file(arg(m, "from"), arg(m, "to"), &options).await?)
        }
        Some(("mv", m)) => {
            let options = MoveFileOptions {
                overwrite: !m.get_flag("no-overwrite"),
                request,
            };
            Ok(service.move_file(arg(m, "from"), arg(m, "to"), &options).await?)
        }
        Some(("quota", m)) => {
            let options = QuotaOptions {
                path: m.get_one::<String>("path").cloned(),
                request,
            };
            print_json(&service.get_quota(&options).await?)
        }
        Some(("caps", m)) => {
            let compliance = service.get_dav_compliance(arg(m, "path"), &request).await?;
            print_json(&serde_json::json!({
                "compliance": compliance.compliance,
                "server": compliance.server,
                "partial_update": compliance.partial_update_strategy(),
            }))
        }
        Some(("lock", m)) => {
            let options = LockOptions {
                timeout: m.get_one::<String>("timeout").cloned(),
                refresh_token: m.get_one::<String>("refresh").cloned(),
                request,
            };
            print_json(&service.lock(arg(m, "path"), &options).await?)
        }
        Some(("unlock", m)) => Ok(service.unlock(arg(m, "path"), arg(m, "token"), &request).await?),
        Some(("link", m)) => {
            let link = if m.get_flag("upload") {
                service.get_file_upload_link(arg(m, "path")).await?
            } else {
                service.get_file_download_link(arg(m, "path")).await?
            };
            println!("{}", link);
            Ok(())
        }
        _ => bail!("Unknown command"),
    }
}

fn with_content_type(mut request: RequestOptions, local: &Path) -> RequestOptions {
    if let Some(mime) = mime_guess::from_path(local).first() {
        request.headers.set("Content-Type", mime.essence_str());
    }
    request
}

/// Mirrors a local tree below `remote_root`, creating collections first
async fn push_tree(service: &WebDAVService, local_root: &Path, remote_root: &str, request: RequestOptions) -> Result<()> {
    if !local_root.is_dir() {
        bail!("{} is not a directory", local_root.display());
    }
    let remote_root = remote_root.trim_end_matches('/');
    let mut uploaded = 0usize;

    for entry in WalkDir::new(local_root).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(local_root)?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let remote = format!("{}/{}", remote_root, relative);

        if entry.file_type().is_dir() {
            let options = CreateDirectoryOptions {
                recursive: true,
                request: request.clone(),
            };
            service.create_directory(&remote, &options).await?;
        } else if entry.file_type().is_file() {
            let data = tokio::fs::read(entry.path()).await?;
            let options = PutFileContentsOptions {
                request: with_content_type(request.clone(), entry.path()),
                ..Default::default()
            };
            service.put_file_contents(&remote, data, &options).await?;
            uploaded += 1;
        }
    }

    info!("✅ Uploaded {} files from {}", uploaded, local_root.display());
    Ok(())
}

async fn pull_tree(service: &WebDAVService, remote_root: &str, dest: &Path, options: &DownloadDirectoryOptions) -> Result<()> {
    let files = service.download_directory(remote_root, options).await?;
    let prefix = remote_root.trim_end_matches('/');
    let mut failed = 0usize;

    for downloaded in files {
        let relative = downloaded
            .file
            .filename
            .strip_prefix(prefix)
            .unwrap_or(&downloaded.file.filename)
            .trim_start_matches('/');
        let target = dest.join(relative);
        match downloaded.contents {
            Ok(bytes) => {
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&target, &bytes).await?;
            }
            Err(e) => {
                warn!("Skipping {}: {}", downloaded.file.filename, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} files failed to download", failed);
    }
    info!("✅ Pulled {} into {}", remote_root, dest.display());
    Ok(())
}
