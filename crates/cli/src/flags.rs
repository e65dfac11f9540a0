use clap::ValueEnum;
use encoding_session::BackendSettings;

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum BackendFlag {
    InProcess,
    PythonChardet,
}

impl BackendFlag {
    pub(crate) fn as_settings(self) -> BackendSettings {
        match self {
            BackendFlag::InProcess => BackendSettings::InProcess,
            BackendFlag::PythonChardet => BackendSettings::PythonChardet,
        }
    }
}
