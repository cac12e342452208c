mod age_band;
mod common;
