//! Test suite for dispatch: eligibility, ranking, and the offer protocol.
