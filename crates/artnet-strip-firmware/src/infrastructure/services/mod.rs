mod ota;

pub(crate) use ota::OtaService;
