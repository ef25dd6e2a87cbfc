pub mod bus;
pub mod io_registers;
