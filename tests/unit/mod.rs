mod locator_tests;
mod report_tests;
