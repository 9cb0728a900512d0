mod common;
mod workspace;
