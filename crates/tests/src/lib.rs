pub mod fixtures;

#[cfg(test)]
mod processing_tests;
#[cfg(test)]
mod realtime_tests;
#[cfg(test)]
mod upload_tests;
