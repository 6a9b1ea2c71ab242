mod client_test;
mod util_test;

use rstest::*;
use tracing_test::traced_test;

use super::*;
