mod harness;

mod naming;
mod service;
