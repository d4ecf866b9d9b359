use super::ExportError;
use crate::personalization::UserProfile;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write any table or document as pretty JSON with a trailing newline
///
/// Field order follows the struct definitions.
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: serde::Serialize + ?Sized,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, data)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// `user_profile.json`
pub fn export_user_profile<P: AsRef<Path>>(
    profile: &UserProfile,
    output_path: P,
) -> Result<(), ExportError> {
    export_json(profile, output_path)
}
