//! Argument vectors for the external tools.

use crate::config::RunSettings;

const SSH_RELAXED_HOST_KEYS: [&str; 4] = [
    "-o",
    "StrictHostKeyChecking=no",
    "-o",
    "UserKnownHostsFile=/dev/null",
];

/// Builds the rsync argument vector: mirror flags, the ssh transport, an
/// optional bandwidth limit, then source and destination.
pub fn rsync_args(settings: &RunSettings) -> Vec<String> {
    let mut args = vec![
        "-avz".to_string(),
        "--delete".to_string(),
        "--partial".to_string(),
        "--stats".to_string(),
        "-e".to_string(),
        ssh_transport(&settings.ssh_key_path),
    ];

    if settings.bandwidth_limit > 0 {
        args.push(format!("--bwlimit={}", settings.bandwidth_limit));
    }

    args.push(source_arg(&settings.source_path, settings.source_is_file));
    args.push(destination_arg(&settings.remote_host, &settings.remote_path));
    args
}

pub fn ssh_transport(key_path: &str) -> String {
    format!("ssh -i {key_path} {}", SSH_RELAXED_HOST_KEYS.join(" "))
}

/// A file source is passed verbatim. A directory source gets exactly one
/// trailing slash so its contents, not the directory itself, are mirrored.
pub fn source_arg(path: &str, is_file: bool) -> String {
    if is_file {
        return path.to_string();
    }
    format!("{}/", path.trim_end_matches('/'))
}

pub fn destination_arg(host: &str, path: &str) -> String {
    format!("{host}:{}/", path.trim_end_matches('/'))
}

/// ssh arguments that list up to five entries of the remote destination.
pub fn remote_check_args(settings: &RunSettings) -> Vec<String> {
    let remote_path = settings.remote_path.trim_end_matches('/');
    let mut args = vec!["-i".to_string(), settings.ssh_key_path.clone()];
    args.extend(SSH_RELAXED_HOST_KEYS.iter().map(|s| s.to_string()));
    args.extend([
        "-o".to_string(),
        "ConnectTimeout=10".to_string(),
        settings.remote_host.clone(),
        format!("ls -A '{remote_path}/' 2>/dev/null | head -5"),
    ]);
    args
}

pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
