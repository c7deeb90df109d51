#[macro_use]
extern crate log;

use std::sync::Arc;

use argh::FromArgs;
use remotefs_smb_directory::{
    Directory, InMemoryCredentialStore, PavaoClientFactory, SearchOption, SmbConfig,
    SmbCredential, SmbDirectory, SmbPathExt,
};

#[derive(FromArgs)]
#[argh(description = "
where positional can be: smb://address[:port]/share[/path] or \\\\address\\share[\\path]

Please, report issues to <https://github.com/remotefs-rs/remotefs-rs-smb>")]
struct Args {
    #[argh(option, short = 'P', description = "specify password")]
    password: Option<String>,
    #[argh(option, short = 'u', description = "specify username")]
    username: String,
    #[argh(
        option,
        short = 'w',
        default = r#""WORKGROUP".to_string()"#,
        description = "specify workgroup"
    )]
    workgroup: String,
    #[argh(
        option,
        short = 'p',
        default = r#""*".to_string()"#,
        description = "search pattern"
    )]
    pattern: String,
    #[argh(positional, description = "share path to list")]
    path: String,
}

fn main() -> anyhow::Result<()> {
    assert!(env_logger::builder().try_init().is_ok());
    let args: Args = argh::from_env();
    let password = match &args.password {
        Some(p) => p.clone(),
        None => read_secret_from_tty("Password: ")?,
    };

    let directory = init_directory(&args, password)?;

    info!("checking whether {} exists...", args.path);
    if !directory.exists(&args.path)? {
        anyhow::bail!("{} does not exist", args.path);
    }

    info!("listing files at {}", args.path);
    let files = directory.enumerate_file_system_infos(
        &args.path,
        &args.pattern,
        SearchOption::AllDirectories,
    )?;

    for file in files {
        let kind = if file.is_dir() { "d" } else { "-" };
        println!("{} {:>12} {}", kind, file.metadata().size, file.path().display());
    }

    Ok(())
}

fn init_directory(args: &Args, password: String) -> anyhow::Result<SmbDirectory> {
    let host = args.path.hostname()?;
    info!(
        "initializing directory engine for host {}, with username {} and workgroup {}",
        host, args.username, args.workgroup
    );
    let credentials = InMemoryCredentialStore::default().with(
        SmbCredential::new(host)
            .username(&args.username)
            .password(password),
    );
    Ok(SmbDirectory::new(
        Arc::new(PavaoClientFactory::default().workgroup(&args.workgroup)),
        Arc::new(credentials),
        SmbConfig::default(),
    ))
}

/// Read a secret from tty with customisable prompt
fn read_secret_from_tty(prompt: &str) -> std::io::Result<String> {
    rpassword::prompt_password(prompt)
}
