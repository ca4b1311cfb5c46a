mod helpers;

mod store_tests;
