use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("WeatherError::Network: {0}")]
    Network(String),
    #[error("WeatherError::Format: {0}")]
    Format(String),
}
impl From<ureq::Error> for WeatherError {
    fn from(e: ureq::Error) -> Self { WeatherError::Network(e.to_string()) }
}
impl From<zip::result::ZipError> for WeatherError {
    fn from(e: zip::result::ZipError) -> Self { WeatherError::Format(format!("archive error: {}", e)) }
}
impl From<std::io::Error> for WeatherError {
    fn from(e: std::io::Error) -> Self { WeatherError::Format(format!("archive read error: {}", e)) }
}
impl From<roxmltree::Error> for WeatherError {
    fn from(e: roxmltree::Error) -> Self { WeatherError::Format(format!("xml error: {}", e)) }
}
impl From<chrono::ParseError> for WeatherError {
    fn from(e: chrono::ParseError) -> Self { WeatherError::Format(format!("bad time step: {}", e)) }
}
impl From<&str> for WeatherError {
    fn from(e: &str) -> Self { WeatherError::Format(e.to_string()) }
}
