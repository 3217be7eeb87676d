//! Maps command lines onto filesystem calls and their results onto the status
//! strings scripts parse from stdout.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use flatfs::{FlatFs, FsError};

#[derive(Debug, PartialEq)]
pub enum Command {
    Create { name: String, content: String },
    Read { name: String },
    Update { name: String, content: String },
    Delete { name: String },
    List,
    Optimize,
    Crash,
}

impl Command {
    /// Parses the arguments after the program name. Unknown commands and missing
    /// arguments yield `None`; extra arguments are ignored.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Option<Self> {
        let mut args = args.into_iter();
        let command = args.next()?;
        let cmd = match command.as_str() {
            "create" => Command::Create {
                name: args.next()?,
                content: args.next()?,
            },
            "read" => Command::Read { name: args.next()? },
            "update" => Command::Update {
                name: args.next()?,
                content: args.next()?,
            },
            "delete" => Command::Delete { name: args.next()? },
            "list" => Command::List,
            "optimize" => Command::Optimize,
            "crash" => Command::Crash,
            _ => return None,
        };
        Some(cmd)
    }
}

/// Mounts `image`, runs `cmd` and renders everything it reports. Only failures
/// that leave the image unusable for this run come back as errors.
pub fn execute(image: &Path, cmd: Command) -> Result<String> {
    let mut fs = FlatFs::mount(image)
        .with_context(|| format!("could not mount {}", image.display()))?;

    let mut out = String::new();
    if let Some(recovery) = fs.recovery() {
        out.push_str("WARNING:Unclean_Shutdown_Detected;");
        if recovery.repaired() {
            out.push_str("FIX:Repaired_Free_Block_Count;");
        }
    }

    let is_update = matches!(cmd, Command::Update { .. });
    let result = match cmd {
        Command::Create { name, content } => fs
            .create(&name, content.as_bytes())
            .map(|block| format!("SUCCESS:Created_at_Block_{}", block)),
        Command::Read { name } => fs
            .read(&name)
            .map(|content| String::from_utf8_lossy(&content).into_owned()),
        Command::Update { name, content } => fs
            .update(&name, content.as_bytes())
            .map(|_| "SUCCESS:Updated_Content".to_string()),
        Command::Delete { name } => fs.delete(&name).map(|_| "SUCCESS:Deleted".to_string()),
        Command::List => Ok(fs.list().to_string()),
        Command::Optimize => fs
            .compact()
            .map(|_| "SUCCESS:Defragmentation_Complete".to_string()),
        Command::Crash => fs
            .force_halt()
            .map(|_| "SUCCESS:System_Halted".to_string()),
    };

    let status = match result {
        Ok(status) => status,
        Err(err) => error_status(&err, is_update).ok_or_else(|| anyhow!(err))?.to_string(),
    };
    out.push_str(&status);
    Ok(out)
}

/// Status string for errors the caller can act on; `None` for fatal ones.
fn error_status(err: &FsError, is_update: bool) -> Option<&'static str> {
    let status = match err {
        FsError::DuplicateName(_) => "ERROR:File_Exists",
        FsError::TableFull => "ERROR:Disk_Full",
        FsError::StoreExhausted => "ERROR:No_Blocks_Left",
        FsError::ContentTooLarge { .. } if is_update => "ERROR:Content_Exceeds_Block_Size",
        FsError::ContentTooLarge { .. } => "ERROR:Content_Too_Large_For_Block",
        FsError::NotFound(_) => "ERROR:File_Not_Found",
        FsError::InvalidName => "ERROR:Invalid_Name",
        FsError::NameTooLong { .. } => "ERROR:Name_Too_Long",
        FsError::BadBlockIndex { .. } => "ERROR:Bad_Block_Index",
        FsError::BadMagic { .. } | FsError::Geometry { .. } | FsError::Io(_) => return None,
    };
    Some(status)
}
