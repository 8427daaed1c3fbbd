mod admin_flow;
mod config;
mod impersonation;
