mod http;

pub(crate) use http::SettingsHttpController;
