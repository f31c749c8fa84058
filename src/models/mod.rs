mod event;
mod extension;
mod version;

pub use event::{InstallEvent, InstallReport};
pub use extension::{Background, ExtensionId, InstallOrigin, InstalledExtension, Manifest};
pub use version::compare_versions;
