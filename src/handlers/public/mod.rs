// handlers/public/mod.rs - endpoints that need no token
//
// Route prefix: /auth/*

pub mod auth;
