pub mod enrollment_record;
