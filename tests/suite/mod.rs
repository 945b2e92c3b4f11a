mod cli;
mod directory;
mod login;
