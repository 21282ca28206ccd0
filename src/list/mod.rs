use std::io::{self, Write};

use tracing::debug;

use crate::config::{ConfigEntry, DeviceSource, Settings};

fn write_row(out: &mut impl Write, ip: &str, port: &str, device: &str) -> io::Result<()> {
    writeln!(out, "{:<15} {:<10} {:<10}", ip, port, device)
}

fn write_table(out: &mut impl Write, entries: &[ConfigEntry]) -> io::Result<()> {
    write_row(out, "IP", "PORT", "DEVICE")?;
    for entry in entries {
        write_row(out, &entry.host, &entry.port_or_default(), &entry.alias)?;
    }
    Ok(())
}

/// Print the built-in devices, then every complete entry in the SSH config.
///
/// Config problems are reported inline and leave the built-in section intact.
pub fn list(out: &mut impl Write, settings: &Settings) -> io::Result<()> {
    writeln!(out, "Default devices:")?;
    // The built-in table never fails to enumerate.
    let builtin = settings.builtin.entries().unwrap_or_default();
    write_table(out, &builtin)?;
    writeln!(out)?;

    let entries = settings.ssh_config_file().and_then(|file| {
        debug!(path = %file.path().display(), "listing SSH config entries");
        file.entries()
    });
    match entries {
        Ok(entries) => {
            writeln!(out, "Devices from ~/.ssh/config:")?;
            write_table(out, &entries)
        }
        Err(e) => writeln!(out, "Error: {}", e),
    }
}
