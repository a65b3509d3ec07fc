mod arena;
mod cpu;
mod event_list;
mod sampling;
mod scheduler;
