use std::{env, path::Path, process::Stdio};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Pid, Signal, System};
use tracing::info;

use super::{daemon_path::to_daemon_path, AppContext};

/// Terminates every process started from `name` except this one and its children. Returns how
/// many were stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            terminate(process);
            killed += 1;
        }
    }
    Ok(killed)
}

fn terminate(process: &sysinfo::Process) {
    // On Windows there is no SIGTERM, the process gets killed.
    if process.kill_with(Signal::Term).is_none() {
        process.kill();
    }
    process.wait();
}

/// Stops whatever daemon is running and starts `typtel-daemon` for `dir` as a detached process.
pub fn restart_server(dir: &Path) -> Result<()> {
    let process_name = to_daemon_path(env::current_exe()?);
    kill_previous_servers(&process_name)?;
    let mut command = std::process::Command::new(&process_name);
    command.arg("--force").arg("--dir").arg(dir);

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x00000008;
        command.creation_flags(DETACHED_PROCESS);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    info!("Spawning {:?}", process_name);
    #[allow(clippy::zombie_processes)]
    let child = command.spawn()?;
    println!("Started daemon with pid {}", child.id());
    Ok(())
}

/// Stops the daemon recorded in `daemon.json`, plus any stray daemon started from the installed
/// binary.
pub async fn stop_server(context: &AppContext) -> Result<()> {
    let mut stopped = 0;
    if let Some(status) = context.status().load().await {
        let system = System::new_all();
        let process = system
            .process(Pid::from_u32(status.pid))
            .filter(|_| status.is_alive());
        if let Some(process) = process {
            terminate(process);
            stopped += 1;
        }
        context.status().remove().await?;
    }
    stopped += kill_previous_servers(&to_daemon_path(env::current_exe()?))?;

    if stopped == 0 {
        println!("Daemon is not running");
    } else {
        println!("Daemon stopped");
    }
    Ok(())
}
