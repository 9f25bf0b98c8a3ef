mod layout;
mod transport;
